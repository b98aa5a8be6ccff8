use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tval_core::CodegenOptions;

use crate::session::SnapshotPolicy;
use crate::{Result, ValidationError};

/// How loudly an unmatched function is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedSeverity {
    Note,
    #[default]
    Warning,
    Error,
}

impl fmt::Display for UnmatchedSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedSeverity::Note => write!(f, "note"),
            UnmatchedSeverity::Warning => write!(f, "warning"),
            UnmatchedSeverity::Error => write!(f, "error"),
        }
    }
}

impl FromStr for UnmatchedSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "note" => Ok(UnmatchedSeverity::Note),
            "warning" => Ok(UnmatchedSeverity::Warning),
            "error" => Ok(UnmatchedSeverity::Error),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Inputs tried per pair when the input space is too large to enumerate.
    pub samples: usize,
    /// Largest input space, in bits, that is enumerated exhaustively.
    pub exhaustive_bits: u32,
    /// Instructions one execution may run before it is abandoned.
    pub step_budget: u64,
    pub pair_timeout_ms: u64,
    pub seed: u64,
}

impl VerifierConfig {
    pub fn pair_timeout(&self) -> Duration {
        Duration::from_millis(self.pair_timeout_ms)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            samples: 256,
            exhaustive_bits: 16,
            step_budget: 10_000,
            pair_timeout_ms: 2_000,
            seed: 0x7465_7374,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub policy: SnapshotPolicy,
    pub unmatched_severity: UnmatchedSeverity,
    pub codegen: CodegenOptions,
    pub verifier: VerifierConfig,
}

impl ValidationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ValidationConfig = serde_json::from_str(json)
            .map_err(|e| ValidationError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn check(&self) -> Result<()> {
        if self.verifier.exhaustive_bits > 24 {
            return Err(ValidationError::Config(format!(
                "exhaustive_bits is {}, at most 24 is supported",
                self.verifier.exhaustive_bits
            )));
        }
        if self.verifier.step_budget == 0 {
            return Err(ValidationError::Config(
                "step_budget must be positive".to_string(),
            ));
        }
        if self.codegen.parallel_outputs {
            return Err(ValidationError::Config(
                "validation generates a single module; parallel_outputs must be false".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ValidationConfig::from_json(r#"{ "policy": "pair-and-clear", "verifier": { "samples": 8 } }"#)
                .unwrap();

        assert_eq!(config.policy, SnapshotPolicy::PairAndClear);
        assert_eq!(config.verifier.samples, 8);
        assert_eq!(config.verifier.exhaustive_bits, 16);
        assert_eq!(config.unmatched_severity, UnmatchedSeverity::Warning);
    }

    #[test]
    fn test_rejects_oversized_exhaustive_space() {
        let err = ValidationConfig::from_json(r#"{ "verifier": { "exhaustive_bits": 40 } }"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Config(_)));
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tval.json");
        std::fs::write(&path, r#"{ "unmatched_severity": "error" }"#).unwrap();

        let config = ValidationConfig::load(&path).unwrap();
        assert_eq!(config.unmatched_severity, UnmatchedSeverity::Error);
        assert!(ValidationConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
