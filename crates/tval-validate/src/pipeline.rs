use tracing::{debug, info};
use tval_core::{clone_module, lower_and_generate, Module};
use tval_transform::{translate_module, vir, EngineContext};

use crate::config::ValidationConfig;
use crate::matcher::{MatchOptions, MatchReport};
use crate::session::{SnapshotPolicy, ValidationSession};
use crate::verifier::RefinementVerifier;
use crate::Result;

/// Takes a snapshot of `module` for comparison. The module itself is only
/// read; a clone is lowered and generated in its place.
pub fn snapshot(
    module: &Module,
    config: &ValidationConfig,
    engine: &EngineContext,
) -> Result<vir::Module> {
    let copy = clone_module(module)?;
    debug!(module = %module.name, stage = %copy.stage(), "cloned module");

    let low = lower_and_generate(copy, &config.codegen)?;
    debug!(module = %low.name, target = %low.target, hash = %low.output_hash, "generated low-level module");

    Ok(translate_module(&low, engine)?)
}

/// Snapshots `module` and hands it to `session`. Returns the comparison
/// against the previous snapshot, if the session held one.
pub fn validate_module(
    session: &mut ValidationSession,
    module: &Module,
    verifier: &mut dyn RefinementVerifier,
    config: &ValidationConfig,
    engine: &EngineContext,
) -> Result<Option<MatchReport>> {
    let snapshot = snapshot(module, config, engine)?;
    let options = MatchOptions {
        unmatched_severity: config.unmatched_severity,
    };
    session.submit(snapshot, verifier, &options)
}

/// Validates `target` against `source` in one step, as the command-line tool
/// does with two input files.
pub fn translation_validation(
    source: &Module,
    target: &Module,
    verifier: &mut dyn RefinementVerifier,
    config: &ValidationConfig,
    engine: &EngineContext,
) -> Result<MatchReport> {
    let mut session = ValidationSession::new(SnapshotPolicy::PairAndClear);
    validate_module(&mut session, source, verifier, config, engine)?;
    let report = validate_module(&mut session, target, verifier, config, engine)?
        .unwrap_or_default();

    info!(
        module = %report.module,
        pairs = report.pairs.len(),
        failures = report.failures().count(),
        "translation validation finished"
    );
    Ok(report)
}
