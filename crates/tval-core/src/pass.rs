use crate::module::Module;
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::debug;

/// What a pass knows about where it sits in the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    pub index: usize,
    /// Name of the pass that ran immediately before, if any.
    pub previous_pass: Option<String>,
}

pub trait ModulePass {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    fn modifies_ir(&self) -> bool {
        true
    }

    fn run(&mut self, module: Module, ctx: &PassContext) -> Result<Module>;
}

#[derive(Debug, Clone)]
pub struct PassStatistics {
    pub name: String,
    pub duration: Duration,
    pub instructions_before: usize,
    pub instructions_after: usize,
}

pub struct PassManager {
    passes: Vec<Box<dyn ModulePass>>,
    statistics: Vec<PassStatistics>,
    collect_stats: bool,
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            statistics: Vec::new(),
            collect_stats: false,
        }
    }

    pub fn enable_statistics(&mut self) {
        self.collect_stats = true;
    }

    pub fn register_pass<P: ModulePass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    pub fn register_boxed(&mut self, pass: Box<dyn ModulePass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn statistics(&self) -> &[PassStatistics] {
        &self.statistics
    }

    /// Runs every registered pass in order. The first error stops the
    /// pipeline.
    pub fn run_all(&mut self, mut module: Module) -> Result<Module> {
        let mut previous: Option<String> = None;

        for (index, pass) in self.passes.iter_mut().enumerate() {
            let ctx = PassContext {
                index,
                previous_pass: previous.clone(),
            };
            let before = count_instructions(&module);
            let start = self.collect_stats.then(Instant::now);

            debug!(pass = pass.name(), module = %module.name, "running pass");
            module = pass.run(module, &ctx)?;

            if let Some(start) = start {
                self.statistics.push(PassStatistics {
                    name: pass.name().to_string(),
                    duration: start.elapsed(),
                    instructions_before: before,
                    instructions_after: count_instructions(&module),
                });
            }
            previous = Some(pass.name().to_string());
        }

        Ok(module)
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

fn count_instructions(module: &Module) -> usize {
    module
        .functions
        .values()
        .map(|f| f.instruction_count())
        .sum()
}
