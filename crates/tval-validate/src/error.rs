use thiserror::Error;
use tval_core::IrError;
use tval_transform::TranslateError;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Module '{module}' defines @{function} more than once")]
    DuplicateFunction { module: String, function: String },

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ValidationError {
    /// True when the error means the pipeline cannot be trusted and the run
    /// must stop.
    pub fn is_invariant(&self) -> bool {
        match self {
            ValidationError::DuplicateFunction { .. } => true,
            ValidationError::Ir(err) => err.is_invariant(),
            ValidationError::Translate(TranslateError::LowLevel(err)) => err.is_invariant(),
            _ => false,
        }
    }
}
