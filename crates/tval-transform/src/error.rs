use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("@{0} is a declaration and has no body to translate")]
    Declaration(String),

    #[error("Unsupported construct in @{function}: {detail}")]
    Unsupported { function: String, detail: String },

    #[error("Target {found} is incompatible with the engine layout {expected}")]
    IncompatibleTarget { expected: String, found: String },

    #[error("Unknown symbol in @{function}: {symbol}")]
    UnknownSymbol { function: String, symbol: String },

    #[error("Low-level IR error: {0}")]
    LowLevel(#[from] tval_core::IrError),
}

impl TranslateError {
    pub fn unsupported(function: &str, detail: impl Into<String>) -> Self {
        TranslateError::Unsupported {
            function: function.to_string(),
            detail: detail.into(),
        }
    }
}
