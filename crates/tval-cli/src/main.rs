use anyhow::{bail, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::fmt;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};
use tval_core::codegen::target::lookup_isa;
use tval_core::codegen::{TargetDescriptor, DEFAULT_TRIPLE};
use tval_core::diagnostics::run_diagnostic_passes;
use tval_core::ir_persist::{load_module, save_module};
use tval_core::opt::{ConstantFolding, DeadCodeElimination};
use tval_core::{lower_and_generate, lower_module, CodegenOptions, Module, ModulePass, PassManager};
use tval_emit::output::write_json;
use tval_emit::{
    Emitter, EmitterConfig, OutputFormat, ProgramEmitter, ReportEmitter, VerbosityLevel,
    VirEmitter,
};
use tval_transform::{translate_module, DataLayout, DiagnosticSink, EngineContext};
use tval_validate::{
    translation_validation, DifferentialVerifier, SnapshotPolicy,
    TranslationValidationPass, UnmatchedSeverity, ValidationConfig,
};

/// Exit status when a comparison found a miscompile, or an unmatched function
/// under error severity.
const EXIT_VALIDATION_FAILED: u8 = 2;

const AVAILABLE_PASSES: &[&str] = &["const-fold", "dce"];

#[derive(Parser)]
#[command(name = "tval")]
#[command(about = "tval - translation validation for optimizer passes")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log more: -v for per-validation summaries, -vv for every stage.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that TARGET is a correct optimization of SOURCE.
    Check {
        source: PathBuf,

        #[arg(id = "target_file", value_name = "TARGET")]
        target: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        validation: ValidationArgs,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a module at one stage of the pipeline.
    Dump {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "vir")]
        stage: DumpStage,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Run optimization passes with translation validation after each one.
    Run {
        file: PathBuf,

        #[arg(long, value_delimiter = ',', default_value = "const-fold,dce")]
        passes: Vec<String>,

        /// Write the optimized module here.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        validation: ValidationArgs,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct InputArgs {
    /// Name both modules are compiled under.
    #[arg(long)]
    module_name: Option<String>,

    /// Directory searched for relative input files.
    #[arg(short = 'I', value_name = "DIR")]
    import_paths: Vec<PathBuf>,

    /// SDK root, searched after the import paths. Defaults to $SDKROOT.
    #[arg(long)]
    sdk: Option<PathBuf>,

    #[arg(long)]
    resource_dir: Option<PathBuf>,

    /// Target triple to generate code for.
    #[arg(long)]
    target: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
struct ValidationArgs {
    /// JSON validation config. Flags given on the command line win.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    policy: Option<SnapshotPolicy>,

    /// How to treat functions present on only one side.
    #[arg(long)]
    unmatched: Option<UnmatchedSeverity>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DumpStage {
    /// As loaded from the file.
    Raw,
    Lowered,
    Clif,
    Vir,
}

#[derive(Debug)]
struct FailedToOpen(PathBuf);

impl fmt::Display for FailedToOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to open file: {}", self.0.display())
    }
}

impl std::error::Error for FailedToOpen {}

impl InputArgs {
    fn sdk_root(&self) -> Option<PathBuf> {
        self.sdk
            .clone()
            .or_else(|| std::env::var_os("SDKROOT").map(PathBuf::from))
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.import_paths.clone();
        dirs.extend(self.resource_dir.clone());
        dirs.extend(self.sdk_root());
        dirs
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() || file.exists() {
            return file.to_path_buf();
        }
        self.search_dirs()
            .into_iter()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| file.to_path_buf())
    }

    /// Loads one input file and reports its diagnostics. Each file is
    /// handled on its own; nothing is shared between the two sides.
    fn load(&self, file: &Path) -> Result<Module> {
        let path = self.resolve(file);
        if std::fs::File::open(&path).is_err() {
            return Err(FailedToOpen(file.to_path_buf()).into());
        }

        let mut module = load_module(&path)?;
        if let Some(name) = &self.module_name {
            module.name = name.clone();
            module.context.module_name = name.clone();
        }
        if module.context.source_file.is_none() {
            module.context.source_file = Some(path.display().to_string());
        }
        debug!(module = %module.name, path = %path.display(), stage = %module.stage(), "loaded module");

        for diagnostic in run_diagnostic_passes(&module) {
            eprintln!("{} {}: {}", "diagnostic:".yellow(), path.display(), diagnostic);
        }
        Ok(module)
    }

    fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            module_name: self.module_name.clone().unwrap_or_default(),
            target_triple: self.target.clone(),
            ..CodegenOptions::default()
        }
    }
}

impl ValidationArgs {
    fn resolve(&self, input: &InputArgs) -> Result<ValidationConfig> {
        let mut config = match &self.config {
            Some(path) => ValidationConfig::load(path)?,
            None => ValidationConfig::default(),
        };
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(severity) = self.unmatched {
            config.unmatched_severity = severity;
        }
        if let Some(name) = &input.module_name {
            config.codegen.module_name = name.clone();
        }
        if input.target.is_some() {
            config.codegen.target_triple = input.target.clone();
        }
        config.check()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let verbose = cli.verbose;
    let result = match cli.command {
        Commands::Check {
            source,
            target,
            input,
            validation,
            format,
        } => cmd_check(&source, &target, &input, &validation, format, verbose),
        Commands::Dump { file, stage, input } => cmd_dump(&file, stage, &input, verbose),
        Commands::Run {
            file,
            passes,
            output,
            input,
            validation,
            format,
        } => cmd_run(&file, &passes, output, &input, &validation, format, verbose),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn emitter_config(verbose: u8) -> EmitterConfig {
    EmitterConfig {
        use_colors: io::stdout().is_terminal(),
        verbosity: if verbose > 0 {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        },
        ..EmitterConfig::default()
    }
}

/// The process-wide engine, set up for the target both sides are generated
/// for.
fn engine_for(config: &ValidationConfig, module: &Module) -> Result<&'static EngineContext> {
    let triple = config
        .codegen
        .target_triple
        .clone()
        .or_else(|| module.options.target_triple.clone())
        .unwrap_or_else(|| DEFAULT_TRIPLE.to_string());
    let isa = lookup_isa(&triple)?;
    let target = TargetDescriptor::from_isa(&*isa);
    Ok(EngineContext::initialize(
        DataLayout::for_target(&target),
        DiagnosticSink::Tracing,
    ))
}

fn exit_status(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(EXIT_VALIDATION_FAILED)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_check(
    source: &Path,
    target: &Path,
    input: &InputArgs,
    validation: &ValidationArgs,
    format: OutputFormat,
    verbose: u8,
) -> Result<ExitCode> {
    let config = validation.resolve(input)?;
    let before = input.load(source)?;
    let after = input.load(target)?;
    let engine = engine_for(&config, &before)?;

    let mut verifier = DifferentialVerifier::new(config.verifier.clone());
    let report = translation_validation(&before, &after, &mut verifier, &config, engine)?;

    match format {
        OutputFormat::Text => print!(
            "{}",
            ReportEmitter::new(emitter_config(verbose)).emit_to_string(&report)?
        ),
        OutputFormat::Json => write_json(&mut io::stdout().lock(), &report)?,
    }
    Ok(exit_status(report.is_failure()))
}

fn cmd_dump(file: &Path, stage: DumpStage, input: &InputArgs, verbose: u8) -> Result<ExitCode> {
    let mut module = input.load(file)?;
    let config = emitter_config(verbose);
    let options = input.codegen_options();

    let text = match stage {
        DumpStage::Raw => ProgramEmitter::new(config).emit_to_string(&module)?,
        DumpStage::Lowered => {
            lower_module(&mut module)?;
            ProgramEmitter::new(config).emit_to_string(&module)?
        }
        DumpStage::Clif => lower_and_generate(module, &options)?.display(),
        DumpStage::Vir => {
            let low = lower_and_generate(module, &options)?;
            let engine = EngineContext::new(
                DataLayout::for_target(&low.target),
                DiagnosticSink::Tracing,
            );
            let vir = translate_module(&low, &engine)?;
            VirEmitter::new(config).emit_to_string(&vir)?
        }
    };
    print!("{}", text);
    Ok(ExitCode::SUCCESS)
}

fn optimization_pass(name: &str) -> Result<Box<dyn ModulePass>> {
    match name {
        "const-fold" => Ok(Box::new(ConstantFolding::new())),
        "dce" => Ok(Box::new(DeadCodeElimination::new())),
        other => bail!(
            "unknown pass '{}'; available passes: {}",
            other,
            AVAILABLE_PASSES.join(", ")
        ),
    }
}

fn cmd_run(
    file: &Path,
    passes: &[String],
    output: Option<PathBuf>,
    input: &InputArgs,
    validation: &ValidationArgs,
    format: OutputFormat,
    verbose: u8,
) -> Result<ExitCode> {
    let config = validation.resolve(input)?;
    let module = input.load(file)?;
    let engine = engine_for(&config, &module)?;

    let validator = TranslationValidationPass::new(
        Box::new(DifferentialVerifier::new(config.verifier.clone())),
        config.clone(),
        engine.clone(),
    );
    let mut manager = PassManager::new();
    manager.enable_statistics();
    manager.register_pass(validator.hook());
    for name in passes {
        manager.register_boxed(optimization_pass(name)?);
        manager.register_pass(validator.hook());
    }

    let optimized = manager.run_all(module)?;
    let validations = validator.validations();

    match format {
        OutputFormat::Text => {
            let emitter = ReportEmitter::new(emitter_config(verbose));
            for validation in &validations {
                let pass = validation.after_pass.as_deref().unwrap_or("<input>");
                println!("{}", format!("after {}", pass).bright_cyan().bold());
                print!("{}", emitter.emit_to_string(&validation.report)?);
                println!();
            }
            if verbose > 0 {
                for stats in manager.statistics() {
                    println!(
                        "{:<24} {:>8.3}ms  {} -> {} instructions",
                        stats.name,
                        stats.duration.as_secs_f64() * 1000.0,
                        stats.instructions_before,
                        stats.instructions_after
                    );
                }
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = validations
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "after_pass": v.after_pass,
                        "report": v.report,
                    })
                })
                .collect();
            write_json(&mut io::stdout().lock(), &entries)?;
        }
    }

    if let Some(path) = output {
        save_module(&optimized, &path)?;
        debug!(path = %path.display(), "wrote optimized module");
    }

    let failed = validations.iter().any(|v| v.report.is_failure());
    Ok(exit_status(failed))
}
