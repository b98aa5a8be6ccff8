use serde::{Deserialize, Serialize};
use std::fmt;
use tval_transform::vir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    Inconclusive,
    Error,
}

impl Verdict {
    /// Verdicts that should fail a validation run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Incorrect | Verdict::Error)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "correct"),
            Verdict::Incorrect => write!(f, "incorrect"),
            Verdict::Inconclusive => write!(f, "inconclusive"),
            Verdict::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub detail: String,
}

impl VerificationReport {
    pub fn new(verdict: Verdict, detail: impl Into<String>) -> Self {
        Self {
            verdict,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.verdict)
        } else {
            write!(f, "{}: {}", self.verdict, self.detail)
        }
    }
}

/// A source function and the target it became, owned for the length of one
/// verification.
#[derive(Debug)]
pub struct Transformation {
    pub name: String,
    pub src: vir::Function,
    pub tgt: vir::Function,
}

impl Transformation {
    pub fn new(src: vir::Function, tgt: vir::Function) -> Self {
        Self {
            name: src.name.clone(),
            src,
            tgt,
        }
    }

    pub fn into_parts(self) -> (vir::Function, vir::Function) {
        (self.src, self.tgt)
    }
}

/// Decides whether `tgt` refines `src`.
pub trait RefinementVerifier {
    fn name(&self) -> &'static str;

    fn verify(&mut self, transformation: &Transformation) -> VerificationReport;
}

impl<V: RefinementVerifier + ?Sized> RefinementVerifier for Box<V> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn verify(&mut self, transformation: &Transformation) -> VerificationReport {
        (**self).verify(transformation)
    }
}
