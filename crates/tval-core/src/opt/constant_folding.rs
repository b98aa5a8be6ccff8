use super::{as_unsigned, normalize};
use crate::instructions::{BinaryOp, CompareOp, ConvertKind, Instruction};
use crate::module::Module;
use crate::pass::{ModulePass, PassContext};
use crate::types::Type;
use crate::values::ValueId;
use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

/// Replaces instructions whose operands are all literals by the literal they
/// compute. Operations that would trap are left alone.
#[derive(Debug, Default)]
pub struct ConstantFolding {
    folded: usize,
}

impl ConstantFolding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folded(&self) -> usize {
        self.folded
    }
}

impl ModulePass for ConstantFolding {
    fn name(&self) -> &'static str {
        "const-fold"
    }

    fn description(&self) -> &'static str {
        "Fold instructions with literal operands"
    }

    fn run(&mut self, mut module: Module, _ctx: &PassContext) -> Result<Module> {
        for function in module.functions.values_mut() {
            let Some(body) = function.body.as_mut() else {
                continue;
            };
            let mut known: HashMap<ValueId, (i64, Type)> = HashMap::new();
            for block in body.blocks.values_mut() {
                for inst in block.instructions.iter_mut() {
                    if let Some(folded) = fold(inst, &known) {
                        *inst = folded;
                        self.folded += 1;
                    }
                    match inst {
                        Instruction::IntegerLiteral { result, ty, value } => {
                            known.insert(*result, (normalize(*value, *ty), *ty));
                        }
                        Instruction::BoolLiteral { result, value } => {
                            known.insert(*result, (i64::from(*value), Type::Bool));
                        }
                        _ => {}
                    }
                }
            }
        }
        debug!(module = %module.name, folded = self.folded, "constant folding done");
        Ok(module)
    }
}

fn literal(result: ValueId, ty: Type, value: i64) -> Instruction {
    match ty {
        Type::Bool => Instruction::BoolLiteral {
            result,
            value: value & 1 == 1,
        },
        _ => Instruction::IntegerLiteral {
            result,
            ty,
            value: normalize(value, ty),
        },
    }
}

fn fold(inst: &Instruction, known: &HashMap<ValueId, (i64, Type)>) -> Option<Instruction> {
    let get = |v: &ValueId| known.get(v).map(|(value, _)| *value);
    match inst {
        Instruction::Binary {
            result,
            op,
            ty,
            left,
            right,
        } => {
            let value = fold_binary(*op, *ty, get(left)?, get(right)?)?;
            Some(literal(*result, *ty, value))
        }
        Instruction::Compare {
            result,
            op,
            ty,
            left,
            right,
        } => {
            let holds = fold_compare(*op, *ty, get(left)?, get(right)?);
            Some(literal(*result, Type::Bool, i64::from(holds)))
        }
        Instruction::Not {
            result,
            ty,
            operand,
        } => {
            let value = get(operand)?;
            let negated = if *ty == Type::Bool { value ^ 1 } else { !value };
            Some(literal(*result, *ty, negated))
        }
        Instruction::Select {
            result,
            ty,
            condition,
            then_value,
            else_value,
        } => {
            let chosen = if get(condition)? != 0 {
                get(then_value)?
            } else {
                get(else_value)?
            };
            Some(literal(*result, *ty, chosen))
        }
        Instruction::Convert {
            result,
            kind,
            from,
            to,
            operand,
        } => {
            let value = get(operand)?;
            let converted = match kind {
                ConvertKind::ZeroExtend => as_unsigned(value, *from) as i64,
                ConvertKind::SignExtend if *from == Type::Bool => -value,
                ConvertKind::SignExtend | ConvertKind::Truncate => value,
            };
            Some(literal(*result, *to, converted))
        }
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, ty: Type, left: i64, right: i64) -> Option<i64> {
    let (ul, ur) = (as_unsigned(left, ty), as_unsigned(right, ty));
    let bits = u64::from(ty.bits());
    let value = match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::And => left & right,
        BinaryOp::Or => left | right,
        BinaryOp::Xor => left ^ right,
        BinaryOp::UDiv if ur != 0 => (ul / ur) as i64,
        BinaryOp::URem if ur != 0 => (ul % ur) as i64,
        BinaryOp::SDiv if right != 0 && !is_signed_min_by_minus_one(ty, left, right) => {
            left / right
        }
        BinaryOp::SRem if right != 0 => {
            if is_signed_min_by_minus_one(ty, left, right) {
                0
            } else {
                left % right
            }
        }
        BinaryOp::Shl => ((ul << (ur % bits)) & mask(ty)) as i64,
        BinaryOp::LShr => (ul >> (ur % bits)) as i64,
        BinaryOp::AShr => left >> (ur % bits),
        _ => return None,
    };
    Some(value)
}

fn mask(ty: Type) -> u64 {
    as_unsigned(-1, ty)
}

fn is_signed_min_by_minus_one(ty: Type, left: i64, right: i64) -> bool {
    right == -1 && left == normalize(1i64 << (ty.bits() - 1), ty)
}

fn fold_compare(op: CompareOp, ty: Type, left: i64, right: i64) -> bool {
    let (ul, ur) = (as_unsigned(left, ty), as_unsigned(right, ty));
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Slt => left < right,
        CompareOp::Sle => left <= right,
        CompareOp::Sgt => left > right,
        CompareOp::Sge => left >= right,
        CompareOp::Ult => ul < ur,
        CompareOp::Ule => ul <= ur,
        CompareOp::Ugt => ul > ur,
        CompareOp::Uge => ul >= ur,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_binary_wraps() {
        assert_eq!(fold_binary(BinaryOp::Add, Type::I8, 127, 1).map(|v| normalize(v, Type::I8)), Some(-128));
        assert_eq!(fold_binary(BinaryOp::UDiv, Type::I32, 7, 0), None);
        assert_eq!(fold_binary(BinaryOp::SDiv, Type::I8, -128, -1), None);
        assert_eq!(fold_binary(BinaryOp::SRem, Type::I8, -128, -1), Some(0));
        assert_eq!(fold_binary(BinaryOp::LShr, Type::I8, -1, 4), Some(15));
    }

    #[test]
    fn test_fold_compare_unsigned() {
        assert!(fold_compare(CompareOp::Ugt, Type::I8, -1, 1));
        assert!(!fold_compare(CompareOp::Sgt, Type::I8, -1, 1));
    }
}
