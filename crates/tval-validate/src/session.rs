use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use tval_transform::vir;

use crate::matcher::{match_and_verify, MatchOptions, MatchReport};
use crate::verifier::RefinementVerifier;
use crate::Result;

/// What happens to the retained snapshot after a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotPolicy {
    /// The compared module becomes the next baseline.
    #[default]
    Accumulate,
    /// Every two snapshots form one isolated comparison.
    PairAndClear,
}

impl fmt::Display for SnapshotPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotPolicy::Accumulate => write!(f, "accumulate"),
            SnapshotPolicy::PairAndClear => write!(f, "pair-and-clear"),
        }
    }
}

impl FromStr for SnapshotPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "accumulate" => Ok(SnapshotPolicy::Accumulate),
            "pair-and-clear" => Ok(SnapshotPolicy::PairAndClear),
            other => Err(format!("unknown snapshot policy '{}'", other)),
        }
    }
}

/// Holds at most one snapshot between validation calls.
#[derive(Debug, Default)]
pub struct ValidationSession {
    policy: SnapshotPolicy,
    retained: Option<vir::Module>,
    comparisons: usize,
}

impl ValidationSession {
    pub fn new(policy: SnapshotPolicy) -> Self {
        Self {
            policy,
            retained: None,
            comparisons: 0,
        }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    pub fn retained(&self) -> Option<&vir::Module> {
        self.retained.as_ref()
    }

    pub fn has_snapshot(&self) -> bool {
        self.retained.is_some()
    }

    /// Number of comparisons run so far.
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    pub fn clear(&mut self) -> Option<vir::Module> {
        self.retained.take()
    }

    /// Compares `snapshot` against the retained one. The first snapshot of a
    /// session, and the first after a clear, is only stored and yields `None`.
    pub fn submit(
        &mut self,
        snapshot: vir::Module,
        verifier: &mut dyn RefinementVerifier,
        options: &MatchOptions,
    ) -> Result<Option<MatchReport>> {
        let Some(before) = self.retained.take() else {
            debug!(module = %snapshot.name, functions = snapshot.len(), "retaining first snapshot");
            self.retained = Some(snapshot);
            return Ok(None);
        };

        let (report, after) = match_and_verify(before, snapshot, verifier, options)?;
        self.comparisons += 1;
        match self.policy {
            SnapshotPolicy::Accumulate => self.retained = Some(after),
            SnapshotPolicy::PairAndClear => {
                debug!(module = %after.name, "comparison done, clearing snapshot");
            }
        }
        Ok(Some(report))
    }
}
