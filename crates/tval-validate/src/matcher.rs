use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};
use tval_transform::vir;

use crate::config::UnmatchedSeverity;
use crate::verifier::{RefinementVerifier, Transformation, Verdict, VerificationReport};
use crate::{Result, ValidationError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub unmatched_severity: UnmatchedSeverity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairOutcome {
    pub name: String,
    pub report: VerificationReport,
}

/// A function present in only one snapshot, with its printed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedFunction {
    pub name: String,
    pub printed: String,
}

impl UnmatchedFunction {
    fn new(function: &vir::Function) -> Self {
        Self {
            name: function.name.clone(),
            printed: function.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub module: String,
    pub pairs: Vec<PairOutcome>,
    pub unmatched_before: Vec<UnmatchedFunction>,
    pub unmatched_after: Vec<UnmatchedFunction>,
    pub unmatched_severity: UnmatchedSeverity,
}

impl MatchReport {
    pub fn count(&self, verdict: Verdict) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.report.verdict == verdict)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairOutcome> {
        self.pairs.iter().filter(|p| p.report.verdict.is_failure())
    }

    pub fn has_unmatched(&self) -> bool {
        !self.unmatched_before.is_empty() || !self.unmatched_after.is_empty()
    }

    /// True when the report should fail the run: an incorrect or errored pair,
    /// or an unmatched function reported at error severity.
    pub fn is_failure(&self) -> bool {
        self.failures().next().is_some()
            || (self.unmatched_severity == UnmatchedSeverity::Error && self.has_unmatched())
    }

    pub fn pair(&self, name: &str) -> Option<&PairOutcome> {
        self.pairs.iter().find(|p| p.name == name)
    }
}

/// Pairs the functions of `before` and `after` by name and verifies every pair.
///
/// Returns the report together with the `after` module, whose functions have
/// passed through the verifier and come back. Duplicate names in either module
/// are rejected before anything is verified.
pub fn match_and_verify(
    before: vir::Module,
    after: vir::Module,
    verifier: &mut dyn RefinementVerifier,
    options: &MatchOptions,
) -> Result<(MatchReport, vir::Module)> {
    let mut index: IndexMap<String, vir::Function> = IndexMap::new();
    let before_name = before.name.clone();
    for function in before.into_functions() {
        if index.contains_key(&function.name) {
            return Err(ValidationError::DuplicateFunction {
                module: before_name,
                function: function.name,
            });
        }
        index.insert(function.name.clone(), function);
    }

    let mut seen = HashSet::new();
    for name in after.names() {
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateFunction {
                module: after.name.clone(),
                function: name.to_string(),
            });
        }
    }

    let mut report = MatchReport {
        module: after.name.clone(),
        unmatched_severity: options.unmatched_severity,
        ..MatchReport::default()
    };
    let mut retained = vir::Module::new(after.name.clone());

    for function in after.into_functions() {
        let Some(src) = index.shift_remove(&function.name) else {
            report_unmatched("after", &function, options.unmatched_severity);
            report.unmatched_after.push(UnmatchedFunction::new(&function));
            retained.push(function);
            continue;
        };

        let transformation = Transformation::new(src, function);
        let outcome = verifier.verify(&transformation);
        match outcome.verdict {
            Verdict::Incorrect | Verdict::Error => warn!(
                module = %report.module,
                function = %transformation.name,
                verdict = %outcome.verdict,
                "{}",
                outcome.detail
            ),
            _ => info!(
                module = %report.module,
                function = %transformation.name,
                verdict = %outcome.verdict,
                "verified pair"
            ),
        }
        report.pairs.push(PairOutcome {
            name: transformation.name.clone(),
            report: outcome,
        });
        let (_, tgt) = transformation.into_parts();
        retained.push(tgt);
    }

    for function in index.values() {
        report_unmatched("before", function, options.unmatched_severity);
        report.unmatched_before.push(UnmatchedFunction::new(function));
    }

    info!(
        module = %report.module,
        pairs = report.pairs.len(),
        unmatched_before = report.unmatched_before.len(),
        unmatched_after = report.unmatched_after.len(),
        verifier = verifier.name(),
        "matched snapshots"
    );
    Ok((report, retained))
}

fn report_unmatched(side: &str, function: &vir::Function, severity: UnmatchedSeverity) {
    match severity {
        UnmatchedSeverity::Note => {
            info!(function = %function.name, side, printed = %function, "unmatched function")
        }
        _ => warn!(function = %function.name, side, printed = %function, "unmatched function"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tval_transform::vir::{Block, BlockRef, Function, Module, Terminator, Type, Value};

    struct Recording(Vec<String>);

    impl RefinementVerifier for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn verify(&mut self, transformation: &Transformation) -> VerificationReport {
            self.0.push(transformation.name.clone());
            VerificationReport::new(Verdict::Correct, "")
        }
    }

    fn identity(name: &str) -> Function {
        Function {
            name: name.to_string(),
            params: vec![Type::I8],
            result: Some(Type::I8),
            blocks: vec![Block {
                id: BlockRef(0),
                params: vec![(Value(0), Type::I8)],
                insts: Vec::new(),
                term: Terminator::Return(vec![Value(0)]),
            }],
        }
    }

    fn module(names: &[&str]) -> Module {
        let mut m = Module::new("m");
        for name in names {
            m.push(identity(name));
        }
        m
    }

    #[test]
    fn test_returned_module_keeps_after_order() {
        let mut verifier = Recording(Vec::new());
        let (report, retained) = match_and_verify(
            module(&["a", "b"]),
            module(&["c", "b", "a"]),
            &mut verifier,
            &MatchOptions::default(),
        )
        .unwrap();

        assert_eq!(verifier.0, vec!["b", "a"]);
        assert_eq!(retained.names(), vec!["c", "b", "a"]);
        assert_eq!(report.unmatched_after[0].name, "c");
        assert!(report.unmatched_after[0].printed.contains("define @c"));
        assert!(report.unmatched_before.is_empty());
    }

    #[test]
    fn test_unmatched_severity_decides_failure() {
        let mut verifier = Recording(Vec::new());
        let options = MatchOptions {
            unmatched_severity: UnmatchedSeverity::Error,
        };
        let (report, _) =
            match_and_verify(module(&["a"]), module(&["b"]), &mut verifier, &options).unwrap();
        assert!(report.is_failure());

        let (report, _) = match_and_verify(
            module(&["a"]),
            module(&["b"]),
            &mut verifier,
            &MatchOptions::default(),
        )
        .unwrap();
        assert!(!report.is_failure());
        assert!(verifier.0.is_empty());
    }
}
