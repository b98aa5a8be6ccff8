use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::debug;
use tval_transform::vir::{Function, Type};

use crate::config::VerifierConfig;
use crate::interp::{Execution, Interpreter, Memory, Outcome};
use crate::verifier::{RefinementVerifier, Transformation, Verdict, VerificationReport};

/// A bounded refinement checker.
///
/// Pairs that print identically apart from their names are accepted at once.
/// Otherwise both functions are run side by side on the same inputs: every
/// input when the parameters and accessed globals fit in
/// `exhaustive_bits`, a seeded sample of inputs when they do not. Only an
/// exhaustive run over call-free functions can prove a pair correct; a sampled
/// run that finds no difference is inconclusive.
pub struct DifferentialVerifier {
    config: VerifierConfig,
}

/// The inputs of one execution: parameters, then the initial globals.
struct Inputs {
    types: Vec<Type>,
    globals: Vec<String>,
    params: usize,
}

impl Inputs {
    fn for_pair(src: &Function, tgt: &Function) -> Self {
        let mut globals: Vec<(String, Type)> = Vec::new();
        for (name, ty) in src.globals().into_iter().chain(tgt.globals()) {
            match globals.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) if existing.bits() < ty.bits() => *existing = ty,
                Some(_) => {}
                None => globals.push((name.to_string(), ty)),
            }
        }

        let mut types = src.params.clone();
        types.extend(globals.iter().map(|(_, ty)| *ty));
        Self {
            types,
            globals: globals.into_iter().map(|(n, _)| n).collect(),
            params: src.params.len(),
        }
    }

    fn bits(&self) -> u32 {
        self.types.iter().map(|t| u32::from(t.bits())).sum()
    }

    fn split(&self, values: &[u64]) -> (Vec<u64>, Memory) {
        let args = values[..self.params].to_vec();
        let memory = self
            .globals
            .iter()
            .cloned()
            .zip(values[self.params..].iter().copied())
            .collect();
        (args, memory)
    }

    /// Unpacks input number `n` of an exhaustive enumeration.
    fn nth(&self, mut n: u64) -> Vec<u64> {
        self.types
            .iter()
            .map(|ty| {
                let v = n & ty.mask();
                n = n.checked_shr(u32::from(ty.bits())).unwrap_or(0);
                v
            })
            .collect()
    }

    fn corner(&self, index: usize) -> Vec<u64> {
        self.types
            .iter()
            .map(|ty| match index {
                0 => 0,
                1 => 1,
                2 => ty.mask(),
                3 => 1u64 << (ty.bits() - 1),
                _ => ty.mask() >> 1,
            })
            .collect()
    }

    fn random(&self, rng: &mut StdRng) -> Vec<u64> {
        self.types
            .iter()
            .map(|ty| rng.gen::<u64>() & ty.mask())
            .collect()
    }

    fn describe(&self, values: &[u64]) -> String {
        let mut parts = Vec::with_capacity(values.len());
        for (i, v) in values.iter().enumerate() {
            if i < self.params {
                parts.push(format!("arg{} = {:#x}", i, v));
            } else {
                parts.push(format!("@{} = {:#x}", self.globals[i - self.params], v));
            }
        }
        if parts.is_empty() {
            "no inputs".to_string()
        } else {
            parts.join(", ")
        }
    }
}

enum Comparison {
    Same,
    Differs(String),
    Skipped,
    Failed(String),
}

impl DifferentialVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    fn compare(&self, t: &Transformation, inputs: &Inputs, values: &[u64]) -> Comparison {
        let (args, memory) = inputs.split(values);
        let run = |function: &Function| {
            Interpreter::new(function, self.config.step_budget, self.config.seed)
                .run(&args, memory.clone())
        };
        let (src, tgt) = match (run(&t.src), run(&t.tgt)) {
            (Ok(src), Ok(tgt)) => (src, tgt),
            (Err(err), _) | (_, Err(err)) => return Comparison::Failed(err.to_string()),
        };
        if src.outcome == Outcome::OutOfFuel || tgt.outcome == Outcome::OutOfFuel {
            return Comparison::Skipped;
        }
        match difference(&src, &tgt) {
            None => Comparison::Same,
            Some(what) => Comparison::Differs(format!("with {}: {}", inputs.describe(values), what)),
        }
    }
}

impl Default for DifferentialVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl RefinementVerifier for DifferentialVerifier {
    fn name(&self) -> &'static str {
        "differential"
    }

    fn verify(&mut self, t: &Transformation) -> VerificationReport {
        if t.src.params != t.tgt.params || t.src.result != t.tgt.result {
            return VerificationReport::new(Verdict::Incorrect, "signatures differ");
        }
        if t.src.body().to_string() == t.tgt.body().to_string() {
            return VerificationReport::new(Verdict::Correct, "identical up to renaming");
        }

        let inputs = Inputs::for_pair(&t.src, &t.tgt);
        let exhaustive = inputs.bits() <= self.config.exhaustive_bits.min(32);
        let has_calls = !t.src.callees().is_empty() || !t.tgt.callees().is_empty();
        let budget = self.config.pair_timeout();
        let start = Instant::now();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let total = if exhaustive {
            1u64 << inputs.bits()
        } else {
            self.config.samples as u64
        };
        let mut skipped = 0u64;
        let mut tried = 0u64;

        for n in 0..total {
            if start.elapsed() > budget {
                return VerificationReport::new(
                    Verdict::Inconclusive,
                    format!("time budget of {:?} ran out after {} inputs", budget, tried),
                );
            }
            let values = if exhaustive {
                inputs.nth(n)
            } else if n < 5 {
                inputs.corner(n as usize)
            } else {
                inputs.random(&mut rng)
            };
            tried += 1;
            match self.compare(t, &inputs, &values) {
                Comparison::Same => {}
                Comparison::Skipped => skipped += 1,
                Comparison::Differs(detail) => {
                    return VerificationReport::new(Verdict::Incorrect, detail)
                }
                Comparison::Failed(detail) => return VerificationReport::new(Verdict::Error, detail),
            }
        }

        debug!(function = %t.name, tried, skipped, exhaustive, "differential check done");
        let mode = if exhaustive { "all" } else { "sampled" };
        if skipped > 0 {
            VerificationReport::new(
                Verdict::Inconclusive,
                format!("{} of {} {} inputs exceeded the step budget", skipped, tried, mode),
            )
        } else if exhaustive && !has_calls {
            VerificationReport::new(
                Verdict::Correct,
                format!("agrees on all {} inputs", tried),
            )
        } else if exhaustive {
            VerificationReport::new(
                Verdict::Inconclusive,
                format!("agrees on all {} inputs under one model of its calls", tried),
            )
        } else {
            VerificationReport::new(
                Verdict::Inconclusive,
                format!("agrees on {} sampled inputs", tried),
            )
        }
    }
}

fn difference(src: &Execution, tgt: &Execution) -> Option<String> {
    if src.outcome != tgt.outcome {
        return Some(format!("source {}, target {}", src.outcome, tgt.outcome));
    }
    for (i, (a, b)) in src.calls.iter().zip(&tgt.calls).enumerate() {
        if a != b {
            return Some(if a.callee == b.callee && a.args == b.args {
                format!("globals differ at call #{} to @{}", i, a.callee)
            } else {
                format!("call #{} is {} in the source, {} in the target", i, a, b)
            });
        }
    }
    if src.calls.len() != tgt.calls.len() {
        return Some(format!(
            "source makes {} calls, target {}",
            src.calls.len(),
            tgt.calls.len()
        ));
    }
    if src.memory != tgt.memory {
        let changed = src
            .memory
            .iter()
            .find(|(name, value)| tgt.memory.get(*name) != Some(*value))
            .map(|(name, _)| name.clone())
            .or_else(|| tgt.memory.keys().find(|k| !src.memory.contains_key(*k)).cloned())
            .unwrap_or_default();
        return Some(format!("@{} differs on exit", changed));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tval_transform::vir::{BinOp, Block, BlockRef, Inst, Terminator, Value};

    /// `f(x) = x <op> c` over i8.
    fn with_constant(name: &str, op: BinOp, c: u64) -> Function {
        Function {
            name: name.to_string(),
            params: vec![Type::I8],
            result: Some(Type::I8),
            blocks: vec![Block {
                id: BlockRef(0),
                params: vec![(Value(0), Type::I8)],
                insts: vec![
                    Inst::Const {
                        dst: Value(1),
                        ty: Type::I8,
                        bits: c,
                    },
                    Inst::Binary {
                        dst: Value(2),
                        op,
                        ty: Type::I8,
                        lhs: Value(0),
                        rhs: Value(1),
                    },
                ],
                term: Terminator::Return(vec![Value(2)]),
            }],
        }
    }

    #[test]
    fn test_multiply_by_two_equals_shift() {
        let t = Transformation::new(
            with_constant("double", BinOp::Mul, 2),
            with_constant("double", BinOp::Shl, 1),
        );
        let report = DifferentialVerifier::default().verify(&t);
        assert_eq!(report.verdict, Verdict::Correct, "{}", report.detail);
    }

    #[test]
    fn test_wrong_constant_is_caught() {
        let t = Transformation::new(
            with_constant("bump", BinOp::Add, 1),
            with_constant("bump", BinOp::Add, 2),
        );
        let report = DifferentialVerifier::default().verify(&t);
        assert_eq!(report.verdict, Verdict::Incorrect);
        assert!(report.detail.contains("arg0 = 0x0"));
    }

    #[test]
    fn test_new_trap_is_caught() {
        let t = Transformation::new(
            with_constant("scale", BinOp::Mul, 1),
            with_constant("scale", BinOp::UDiv, 0),
        );
        let report = DifferentialVerifier::default().verify(&t);
        assert_eq!(report.verdict, Verdict::Incorrect);
        assert!(report.detail.contains("trapped"));
    }

    #[test]
    fn test_large_inputs_are_sampled() {
        let mut src = with_constant("wide", BinOp::Mul, 2);
        let mut tgt = with_constant("wide", BinOp::Shl, 1);
        for f in [&mut src, &mut tgt] {
            f.params = vec![Type::I8, Type::I8, Type::I8];
            f.blocks[0].params = vec![
                (Value(0), Type::I8),
                (Value(3), Type::I8),
                (Value(4), Type::I8),
            ];
        }
        let mut verifier = DifferentialVerifier::new(VerifierConfig {
            samples: 32,
            ..VerifierConfig::default()
        });

        let report = verifier.verify(&Transformation::new(src, tgt));
        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert!(report.detail.contains("32 sampled"));
    }

    #[test]
    fn test_signature_change_is_incorrect() {
        let src = with_constant("f", BinOp::Add, 1);
        let mut tgt = with_constant("f", BinOp::Add, 1);
        tgt.result = None;
        let report = DifferentialVerifier::default().verify(&Transformation::new(src, tgt));
        assert_eq!(report.verdict, Verdict::Incorrect);
    }
}
