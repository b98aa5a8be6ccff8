/*! A reference interpreter for verification IR.
 *
 * Integer semantics follow Cranelift: arithmetic wraps, shift amounts are taken modulo the width,
 * and division by zero or `MIN / -1` traps. Calls are uninterpreted: each call is recorded in the
 * trace together with the globals visible at that point, and its result is a fixed function of the
 * callee, its arguments and the call's position in the trace.
 */

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use tval_transform::vir::{
    BinOp, BlockRef, Cond, ExtendKind, Function, Inst, OverflowOp, Terminator, Type, Value,
};

pub const DIVIDE_BY_ZERO: &str = "int_divz";
pub const INTEGER_OVERFLOW: &str = "int_ovf";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpError {
    #[error("@{function}: {value} is used before it is defined")]
    UndefinedValue { function: String, value: Value },
    #[error("@{function}: no block {block}")]
    UnknownBlock { function: String, block: BlockRef },
    #[error("@{function}: {detail}")]
    Malformed { function: String, detail: String },
}

/// Global values, keyed by name.
pub type Memory = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Return(Option<u64>),
    Trap(String),
    /// The step budget ran out before the function finished.
    OutOfFuel,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Return(Some(v)) => write!(f, "returned {:#x}", v),
            Outcome::Return(None) => write!(f, "returned"),
            Outcome::Trap(code) => write!(f, "trapped ({})", code),
            Outcome::OutOfFuel => write!(f, "ran out of steps"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub callee: String,
    pub args: Vec<u64>,
    pub memory: Memory,
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}(", self.callee)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:#x}", arg)?;
        }
        write!(f, ")")
    }
}

/// Everything an execution makes observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub outcome: Outcome,
    pub calls: Vec<CallEvent>,
    pub memory: Memory,
}

pub struct Interpreter<'f> {
    function: &'f Function,
    step_budget: u64,
    seed: u64,
}

impl<'f> Interpreter<'f> {
    pub fn new(function: &'f Function, step_budget: u64, seed: u64) -> Self {
        Self {
            function,
            step_budget,
            seed,
        }
    }

    pub fn run(&self, args: &[u64], memory: Memory) -> Result<Execution, InterpError> {
        let entry = self
            .function
            .entry()
            .ok_or_else(|| self.malformed("function has no blocks"))?;
        if entry.params.len() != args.len() {
            return Err(self.malformed(format!(
                "called with {} arguments, takes {}",
                args.len(),
                entry.params.len()
            )));
        }

        let mut frame = Frame {
            values: HashMap::new(),
            memory,
            calls: Vec::new(),
        };
        for ((value, ty), arg) in entry.params.iter().zip(args) {
            frame.values.insert(*value, arg & ty.mask());
        }

        let mut block = entry;
        let mut steps = 0u64;
        loop {
            for inst in &block.insts {
                steps += 1;
                if steps > self.step_budget {
                    return Ok(frame.finish(Outcome::OutOfFuel));
                }
                if let Some(code) = self.step(inst, &mut frame)? {
                    return Ok(frame.finish(Outcome::Trap(code)));
                }
            }

            steps += 1;
            if steps > self.step_budget {
                return Ok(frame.finish(Outcome::OutOfFuel));
            }
            let (target, args) = match &block.term {
                Terminator::Return(values) => {
                    let value = match values.as_slice() {
                        [] => None,
                        [v] => Some(self.read(&frame, *v)?),
                        _ => return Err(self.malformed("multiple return values")),
                    };
                    return Ok(frame.finish(Outcome::Return(value)));
                }
                Terminator::Trap { code } => {
                    return Ok(frame.finish(Outcome::Trap(code.clone())));
                }
                Terminator::Jump { target, args } => (*target, args),
                Terminator::Branch {
                    cond,
                    then_target,
                    then_args,
                    else_target,
                    else_args,
                } => {
                    if self.read(&frame, *cond)? != 0 {
                        (*then_target, then_args)
                    } else {
                        (*else_target, else_args)
                    }
                }
            };

            let next = self.function.block(target).ok_or(InterpError::UnknownBlock {
                function: self.function.name.clone(),
                block: target,
            })?;
            if next.params.len() != args.len() {
                return Err(self.malformed(format!(
                    "{} takes {} arguments, branch passes {}",
                    target,
                    next.params.len(),
                    args.len()
                )));
            }
            let incoming = args
                .iter()
                .map(|&a| self.read(&frame, a))
                .collect::<Result<Vec<_>, _>>()?;
            for ((value, ty), v) in next.params.iter().zip(incoming) {
                frame.values.insert(*value, v & ty.mask());
            }
            block = next;
        }
    }

    /// Executes one instruction, returning the trap code if it traps.
    fn step(&self, inst: &Inst, frame: &mut Frame) -> Result<Option<String>, InterpError> {
        match inst {
            Inst::Const { dst, ty, bits } => {
                frame.values.insert(*dst, bits & ty.mask());
            }
            Inst::Binary {
                dst,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let lhs = self.read(frame, *lhs)?;
                let rhs = self.read(frame, *rhs)?;
                match binary(*op, *ty, lhs, rhs) {
                    Ok(v) => {
                        frame.values.insert(*dst, v);
                    }
                    Err(code) => return Ok(Some(code.to_string())),
                }
            }
            Inst::Overflow {
                dst,
                flag,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let lhs = self.read(frame, *lhs)?;
                let rhs = self.read(frame, *rhs)?;
                let (v, overflowed) = overflowing(*op, *ty, lhs, rhs);
                frame.values.insert(*dst, v);
                frame.values.insert(*flag, u64::from(overflowed));
            }
            Inst::Not { dst, ty, arg } => {
                let v = self.read(frame, *arg)?;
                frame.values.insert(*dst, !v & ty.mask());
            }
            Inst::Neg { dst, ty, arg } => {
                let v = self.read(frame, *arg)?;
                frame.values.insert(*dst, v.wrapping_neg() & ty.mask());
            }
            Inst::Icmp {
                dst,
                cond,
                ty,
                lhs,
                rhs,
            } => {
                let lhs = self.read(frame, *lhs)?;
                let rhs = self.read(frame, *rhs)?;
                frame
                    .values
                    .insert(*dst, u64::from(compare(*cond, *ty, lhs, rhs)));
            }
            Inst::Select {
                dst,
                ty,
                cond,
                if_true,
                if_false,
            } => {
                let picked = if self.read(frame, *cond)? != 0 {
                    *if_true
                } else {
                    *if_false
                };
                let v = self.read(frame, picked)?;
                frame.values.insert(*dst, v & ty.mask());
            }
            Inst::Extend {
                dst,
                kind,
                from,
                to,
                arg,
            } => {
                let v = self.read(frame, *arg)?;
                let extended = match kind {
                    ExtendKind::Zero | ExtendKind::Truncate => v,
                    ExtendKind::Sign => signed(v, *from) as u64,
                };
                frame.values.insert(*dst, extended & to.mask());
            }
            Inst::Call {
                results,
                callee,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|&a| self.read(frame, a))
                    .collect::<Result<Vec<_>, _>>()?;
                let ordinal = frame.calls.len();
                for (index, (value, ty)) in results.iter().enumerate() {
                    let v = self.call_result(callee, &args, ordinal, index);
                    frame.values.insert(*value, v & ty.mask());
                }
                frame.calls.push(CallEvent {
                    callee: callee.clone(),
                    args,
                    memory: frame.memory.clone(),
                });
            }
            Inst::Load { dst, ty, global } => {
                let v = frame.memory.get(global).copied().unwrap_or(0);
                frame.values.insert(*dst, v & ty.mask());
            }
            Inst::Store { global, ty, value } => {
                let v = self.read(frame, *value)?;
                frame.memory.insert(global.clone(), v & ty.mask());
            }
            Inst::TrapIf { cond, code } => {
                if self.read(frame, *cond)? != 0 {
                    return Ok(Some(code.clone()));
                }
            }
        }
        Ok(None)
    }

    fn call_result(&self, callee: &str, args: &[u64], ordinal: usize, index: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        callee.hash(&mut hasher);
        args.hash(&mut hasher);
        ordinal.hash(&mut hasher);
        index.hash(&mut hasher);
        hasher.finish()
    }

    fn read(&self, frame: &Frame, value: Value) -> Result<u64, InterpError> {
        frame
            .values
            .get(&value)
            .copied()
            .ok_or_else(|| InterpError::UndefinedValue {
                function: self.function.name.clone(),
                value,
            })
    }

    fn malformed(&self, detail: impl Into<String>) -> InterpError {
        InterpError::Malformed {
            function: self.function.name.clone(),
            detail: detail.into(),
        }
    }
}

struct Frame {
    values: HashMap<Value, u64>,
    memory: Memory,
    calls: Vec<CallEvent>,
}

impl Frame {
    fn finish(self, outcome: Outcome) -> Execution {
        Execution {
            outcome,
            calls: self.calls,
            memory: self.memory,
        }
    }
}

/// `bits` read as a two's complement value of type `ty`.
pub fn signed(bits: u64, ty: Type) -> i64 {
    let shift = 64 - u32::from(ty.bits());
    ((bits << shift) as i64) >> shift
}

fn min_signed(ty: Type) -> u64 {
    1u64 << (ty.bits() - 1)
}

fn binary(op: BinOp, ty: Type, lhs: u64, rhs: u64) -> Result<u64, &'static str> {
    let mask = ty.mask();
    let shift = (rhs % u64::from(ty.bits())) as u32;
    let v = match op {
        BinOp::Add => lhs.wrapping_add(rhs),
        BinOp::Sub => lhs.wrapping_sub(rhs),
        BinOp::Mul => lhs.wrapping_mul(rhs),
        BinOp::And => lhs & rhs,
        BinOp::Or => lhs | rhs,
        BinOp::Xor => lhs ^ rhs,
        BinOp::Shl => lhs << shift,
        BinOp::LShr => lhs >> shift,
        BinOp::AShr => (signed(lhs, ty) >> shift) as u64,
        BinOp::UDiv | BinOp::URem | BinOp::SDiv | BinOp::SRem if rhs == 0 => {
            return Err(DIVIDE_BY_ZERO)
        }
        BinOp::UDiv => lhs / rhs,
        BinOp::URem => lhs % rhs,
        BinOp::SDiv if lhs == min_signed(ty) && rhs == mask => return Err(INTEGER_OVERFLOW),
        BinOp::SDiv => signed(lhs, ty).wrapping_div(signed(rhs, ty)) as u64,
        BinOp::SRem => signed(lhs, ty).wrapping_rem(signed(rhs, ty)) as u64,
    };
    Ok(v & mask)
}

fn overflowing(op: OverflowOp, ty: Type, lhs: u64, rhs: u64) -> (u64, bool) {
    let mask = ty.mask();
    match op {
        OverflowOp::SAdd | OverflowOp::SSub | OverflowOp::SMul => {
            let (l, r) = (i128::from(signed(lhs, ty)), i128::from(signed(rhs, ty)));
            let exact = match op {
                OverflowOp::SAdd => l + r,
                OverflowOp::SSub => l - r,
                _ => l * r,
            };
            let half = 1i128 << (ty.bits() - 1);
            ((exact as u64) & mask, exact < -half || exact >= half)
        }
        OverflowOp::USub => (lhs.wrapping_sub(rhs) & mask, lhs < rhs),
        OverflowOp::UAdd | OverflowOp::UMul => {
            let (l, r) = (u128::from(lhs), u128::from(rhs));
            let exact = if op == OverflowOp::UAdd { l + r } else { l * r };
            ((exact as u64) & mask, exact > u128::from(mask))
        }
    }
}

fn compare(cond: Cond, ty: Type, lhs: u64, rhs: u64) -> bool {
    let (sl, sr) = (signed(lhs, ty), signed(rhs, ty));
    match cond {
        Cond::Eq => lhs == rhs,
        Cond::Ne => lhs != rhs,
        Cond::Slt => sl < sr,
        Cond::Sle => sl <= sr,
        Cond::Sgt => sl > sr,
        Cond::Sge => sl >= sr,
        Cond::Ult => lhs < rhs,
        Cond::Ule => lhs <= rhs,
        Cond::Ugt => lhs > rhs,
        Cond::Uge => lhs >= rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tval_transform::vir::Block;

    #[test]
    fn test_signed_reinterpretation() {
        assert_eq!(signed(0xff, Type::I8), -1);
        assert_eq!(signed(0x7f, Type::I8), 127);
        assert_eq!(signed(0x8000, Type::I16), -32768);
        assert_eq!(signed(u64::MAX, Type::I64), -1);
    }

    #[test]
    fn test_division_traps() {
        assert_eq!(binary(BinOp::UDiv, Type::I8, 7, 0), Err(DIVIDE_BY_ZERO));
        assert_eq!(binary(BinOp::SDiv, Type::I8, 0x80, 0xff), Err(INTEGER_OVERFLOW));
        assert_eq!(binary(BinOp::SRem, Type::I8, 0x80, 0xff), Ok(0));
        assert_eq!(binary(BinOp::SDiv, Type::I8, 0xf9, 2), Ok(0xfd));
    }

    #[test]
    fn test_shift_amount_wraps() {
        assert_eq!(binary(BinOp::Shl, Type::I8, 1, 9), Ok(2));
        assert_eq!(binary(BinOp::AShr, Type::I8, 0x80, 7), Ok(0xff));
        assert_eq!(binary(BinOp::LShr, Type::I8, 0x80, 7), Ok(1));
    }

    #[test]
    fn test_overflow_flags() {
        assert_eq!(overflowing(OverflowOp::SAdd, Type::I8, 0x7f, 1), (0x80, true));
        assert_eq!(overflowing(OverflowOp::UAdd, Type::I8, 0x7f, 1), (0x80, false));
        assert_eq!(overflowing(OverflowOp::USub, Type::I8, 0, 1), (0xff, true));
        assert_eq!(
            overflowing(OverflowOp::SMul, Type::I64, u64::MAX, u64::MAX),
            (1, false)
        );
    }

    #[test]
    fn test_store_then_call_is_observed() {
        let function = Function {
            name: "bump".to_string(),
            params: vec![Type::I8],
            result: None,
            blocks: vec![Block {
                id: BlockRef(0),
                params: vec![(Value(0), Type::I8)],
                insts: vec![
                    Inst::Store {
                        global: "g".to_string(),
                        ty: Type::I8,
                        value: Value(0),
                    },
                    Inst::Call {
                        results: Vec::new(),
                        callee: "observe".to_string(),
                        args: vec![Value(0)],
                    },
                ],
                term: Terminator::Return(Vec::new()),
            }],
        };

        let execution = Interpreter::new(&function, 100, 0)
            .run(&[0x1ff], Memory::new())
            .unwrap();
        assert_eq!(execution.outcome, Outcome::Return(None));
        assert_eq!(execution.calls.len(), 1);
        assert_eq!(execution.calls[0].args, vec![0xff]);
        assert_eq!(execution.calls[0].memory.get("g"), Some(&0xff));
    }

    #[test]
    fn test_infinite_loop_runs_out_of_fuel() {
        let function = Function {
            name: "spin".to_string(),
            params: Vec::new(),
            result: None,
            blocks: vec![Block {
                id: BlockRef(0),
                params: Vec::new(),
                insts: Vec::new(),
                term: Terminator::Jump {
                    target: BlockRef(0),
                    args: Vec::new(),
                },
            }],
        };

        let execution = Interpreter::new(&function, 50, 0)
            .run(&[], Memory::new())
            .unwrap();
        assert_eq!(execution.outcome, Outcome::OutOfFuel);
    }
}
