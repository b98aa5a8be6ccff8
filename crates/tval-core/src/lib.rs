/*! Program module IR and the stages that prepare it for translation validation.
 *
 * Validating an optimization pass means comparing what the program looked like before and after it
 * ran, without trusting the pass. This crate holds the optimizer-level IR, a cloner that produces
 * non-aliasing copies, the forward-only lowering stages, and the bridge that turns a lowered module
 * into Cranelift IR for a concrete target.
 */

pub mod block;
pub mod builder;
pub mod cloner;
pub mod codegen;
pub mod diagnostics;
pub mod dominance;
pub mod format;
pub mod function;
pub mod global;
pub mod instructions;
pub mod ir_persist;
pub mod lowering;
pub mod module;
pub mod opt;
pub mod pass;
pub mod stage;
pub mod types;
pub mod values;

pub use block::{BasicBlock, BlockId, BlockParam, Terminator};
pub use builder::{BlockBuilder, FunctionBuilder, ModuleBuilder};
pub use cloner::clone_module;
pub use codegen::{generate_low_level, lower_and_generate, CodegenOptions, LowLevelModule};
pub use diagnostics::Diagnostic;
pub use function::{Function, FunctionAttributes, FunctionBody, Linkage};
pub use global::{GlobalVariable, StaticInitializer};
pub use instructions::{BinaryOp, CompareOp, ConvertKind, Instruction, OverflowOp};
pub use lowering::lower_module;
pub use module::Module;
pub use pass::{ModulePass, PassContext, PassManager};
pub use stage::Stage;
pub use types::{FunctionType, Type, TypeTable};
pub use values::{SourceLocation, ValueId};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Invariant violation: {0}")]
    Invariant(String),
    #[error("Module failed verification with {} diagnostic(s): {}", .0.len(), diagnostics::summarize(.0))]
    Diagnostics(Vec<Diagnostic>),
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Codegen error: {0}")]
    CodegenError(String),
    #[error("Cranelift error: {0}")]
    CraneliftError(String),
    #[error("Persist error: {0}")]
    PersistError(String),
}

impl IrError {
    /// Errors that mean the pipeline itself is broken rather than that a
    /// request was malformed. Callers abort on these.
    pub fn is_invariant(&self) -> bool {
        matches!(self, IrError::Invariant(_) | IrError::Diagnostics(_))
    }
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
