use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a module has progressed toward code generation. Stages only move
/// forward: `Raw < Canonical < Lowered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Raw,
    Canonical,
    Lowered,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Raw => Some(Stage::Canonical),
            Stage::Canonical => Some(Stage::Lowered),
            Stage::Lowered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Lowered
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Raw => write!(f, "raw"),
            Stage::Canonical => write!(f, "canonical"),
            Stage::Lowered => write!(f, "lowered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(Stage::Raw < Stage::Canonical);
        assert!(Stage::Canonical < Stage::Lowered);
        assert_eq!(Stage::Raw.next(), Some(Stage::Canonical));
        assert_eq!(Stage::Lowered.next(), None);
        assert!(Stage::Lowered.is_terminal());
    }
}
