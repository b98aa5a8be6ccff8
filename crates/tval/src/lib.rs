/*! Unified interface for translation validation.
 *
 * One import for the whole pipeline: building and persisting program modules, lowering them through
 * Cranelift, translating into verification IR, pairing snapshots and rendering the results.
 */

pub use tval_core as core;
pub use tval_emit as emit;
pub use tval_transform as transform;
pub use tval_validate as validate;

pub use tval_core::{
    clone_module, lower_and_generate, lower_module, CodegenOptions, Module, ModuleBuilder,
    ModulePass, PassManager, Stage, Type,
};

pub use tval_transform::{translate_module, vir, DataLayout, DiagnosticSink, EngineContext};

pub use tval_validate::{
    translation_validation, validate_module, DifferentialVerifier, MatchReport,
    RefinementVerifier, SnapshotPolicy, TranslationValidationPass, ValidationConfig,
    ValidationSession, Verdict,
};

pub use tval_emit::{ReportEmitter, VirEmitter};
