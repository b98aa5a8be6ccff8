/*! Translate generated low-level code into the verification IR.
 *
 * The equivalence engine never sees Cranelift directly. Each generated function is rewritten into
 * a small, fully explicit SSA form whose values and blocks are numbered by layout, so two functions
 * that differ only in how the backend happened to name things print the same.
 */

pub mod engine;
pub mod error;
pub mod translate;
pub mod vir;

pub use engine::{DataLayout, DiagnosticSink, EngineContext};
pub use error::TranslateError;
pub use translate::{translate_function, translate_module};

pub type Result<T> = std::result::Result<T, TranslateError>;
