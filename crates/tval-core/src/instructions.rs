use crate::types::Type;
use crate::values::ValueId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinaryOp {
    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    /// Division and remainder trap on a zero divisor.
    pub fn can_trap(&self) -> bool {
        matches!(
            self,
            BinaryOp::UDiv | BinaryOp::SDiv | BinaryOp::URem | BinaryOp::SRem
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::URem => "urem",
            BinaryOp::SRem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverflowOp {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for OverflowOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowOp::Add => write!(f, "add"),
            OverflowOp::Sub => write!(f, "sub"),
            OverflowOp::Mul => write!(f, "mul"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Slt => "slt",
            CompareOp::Sle => "sle",
            CompareOp::Sgt => "sgt",
            CompareOp::Sge => "sge",
            CompareOp::Ult => "ult",
            CompareOp::Ule => "ule",
            CompareOp::Ugt => "ugt",
            CompareOp::Uge => "uge",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvertKind {
    ZeroExtend,
    SignExtend,
    Truncate,
}

impl fmt::Display for ConvertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertKind::ZeroExtend => write!(f, "zext"),
            ConvertKind::SignExtend => write!(f, "sext"),
            ConvertKind::Truncate => write!(f, "trunc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    IntegerLiteral {
        result: ValueId,
        ty: Type,
        value: i64,
    },
    BoolLiteral {
        result: ValueId,
        value: bool,
    },
    Binary {
        result: ValueId,
        op: BinaryOp,
        ty: Type,
        left: ValueId,
        right: ValueId,
    },

    /// Arithmetic that traps on overflow. Only legal before lowering.
    CheckedArith {
        result: ValueId,
        op: OverflowOp,
        signed: bool,
        ty: Type,
        left: ValueId,
        right: ValueId,
    },
    ArithWithOverflow {
        result: ValueId,
        overflow: ValueId,
        op: OverflowOp,
        signed: bool,
        ty: Type,
        left: ValueId,
        right: ValueId,
    },

    Compare {
        result: ValueId,
        op: CompareOp,
        ty: Type,
        left: ValueId,
        right: ValueId,
    },
    Not {
        result: ValueId,
        ty: Type,
        operand: ValueId,
    },
    Select {
        result: ValueId,
        ty: Type,
        condition: ValueId,
        then_value: ValueId,
        else_value: ValueId,
    },
    Convert {
        result: ValueId,
        kind: ConvertKind,
        from: Type,
        to: Type,
        operand: ValueId,
    },

    Apply {
        result: Option<(ValueId, Type)>,
        callee: String,
        args: Vec<ValueId>,
    },

    LoadGlobal {
        result: ValueId,
        ty: Type,
        global: String,
    },
    StoreGlobal {
        global: String,
        ty: Type,
        value: ValueId,
    },

    CondFail {
        condition: ValueId,
        message: String,
    },

    /// Source-level variable annotation. Only legal before lowering.
    DebugValue {
        value: ValueId,
        name: String,
    },
}

impl Instruction {
    pub fn definitions(&self) -> Vec<(ValueId, Type)> {
        match self {
            Instruction::IntegerLiteral { result, ty, .. } => vec![(*result, *ty)],
            Instruction::BoolLiteral { result, .. } => vec![(*result, Type::Bool)],
            Instruction::Binary { result, ty, .. }
            | Instruction::CheckedArith { result, ty, .. }
            | Instruction::Not { result, ty, .. }
            | Instruction::Select { result, ty, .. }
            | Instruction::LoadGlobal { result, ty, .. } => vec![(*result, *ty)],
            Instruction::ArithWithOverflow {
                result,
                overflow,
                ty,
                ..
            } => vec![(*result, *ty), (*overflow, Type::Bool)],
            Instruction::Compare { result, .. } => vec![(*result, Type::Bool)],
            Instruction::Convert { result, to, .. } => vec![(*result, *to)],
            Instruction::Apply { result, .. } => result.iter().copied().collect(),
            Instruction::StoreGlobal { .. }
            | Instruction::CondFail { .. }
            | Instruction::DebugValue { .. } => Vec::new(),
        }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Instruction::IntegerLiteral { .. }
            | Instruction::BoolLiteral { .. }
            | Instruction::LoadGlobal { .. } => Vec::new(),
            Instruction::Binary { left, right, .. }
            | Instruction::CheckedArith { left, right, .. }
            | Instruction::ArithWithOverflow { left, right, .. }
            | Instruction::Compare { left, right, .. } => vec![*left, *right],
            Instruction::Not { operand, .. } | Instruction::Convert { operand, .. } => {
                vec![*operand]
            }
            Instruction::Select {
                condition,
                then_value,
                else_value,
                ..
            } => vec![*condition, *then_value, *else_value],
            Instruction::Apply { args, .. } => args.clone(),
            Instruction::StoreGlobal { value, .. } => vec![*value],
            Instruction::CondFail { condition, .. } => vec![*condition],
            Instruction::DebugValue { value, .. } => vec![*value],
        }
    }

    /// Rewrites every defined and used value through `f`.
    pub fn map_values(&self, f: &mut impl FnMut(ValueId) -> ValueId) -> Instruction {
        match self {
            Instruction::IntegerLiteral { result, ty, value } => Instruction::IntegerLiteral {
                result: f(*result),
                ty: *ty,
                value: *value,
            },
            Instruction::BoolLiteral { result, value } => Instruction::BoolLiteral {
                result: f(*result),
                value: *value,
            },
            Instruction::Binary {
                result,
                op,
                ty,
                left,
                right,
            } => Instruction::Binary {
                result: f(*result),
                op: *op,
                ty: *ty,
                left: f(*left),
                right: f(*right),
            },
            Instruction::CheckedArith {
                result,
                op,
                signed,
                ty,
                left,
                right,
            } => Instruction::CheckedArith {
                result: f(*result),
                op: *op,
                signed: *signed,
                ty: *ty,
                left: f(*left),
                right: f(*right),
            },
            Instruction::ArithWithOverflow {
                result,
                overflow,
                op,
                signed,
                ty,
                left,
                right,
            } => Instruction::ArithWithOverflow {
                result: f(*result),
                overflow: f(*overflow),
                op: *op,
                signed: *signed,
                ty: *ty,
                left: f(*left),
                right: f(*right),
            },
            Instruction::Compare {
                result,
                op,
                ty,
                left,
                right,
            } => Instruction::Compare {
                result: f(*result),
                op: *op,
                ty: *ty,
                left: f(*left),
                right: f(*right),
            },
            Instruction::Not {
                result,
                ty,
                operand,
            } => Instruction::Not {
                result: f(*result),
                ty: *ty,
                operand: f(*operand),
            },
            Instruction::Select {
                result,
                ty,
                condition,
                then_value,
                else_value,
            } => Instruction::Select {
                result: f(*result),
                ty: *ty,
                condition: f(*condition),
                then_value: f(*then_value),
                else_value: f(*else_value),
            },
            Instruction::Convert {
                result,
                kind,
                from,
                to,
                operand,
            } => Instruction::Convert {
                result: f(*result),
                kind: *kind,
                from: *from,
                to: *to,
                operand: f(*operand),
            },
            Instruction::Apply {
                result,
                callee,
                args,
            } => Instruction::Apply {
                result: result.map(|(value, ty)| (f(value), ty)),
                callee: callee.clone(),
                args: args.iter().map(|arg| f(*arg)).collect(),
            },
            Instruction::LoadGlobal { result, ty, global } => Instruction::LoadGlobal {
                result: f(*result),
                ty: *ty,
                global: global.clone(),
            },
            Instruction::StoreGlobal { global, ty, value } => Instruction::StoreGlobal {
                global: global.clone(),
                ty: *ty,
                value: f(*value),
            },
            Instruction::CondFail { condition, message } => Instruction::CondFail {
                condition: f(*condition),
                message: message.clone(),
            },
            Instruction::DebugValue { value, name } => Instruction::DebugValue {
                value: f(*value),
                name: name.clone(),
            },
        }
    }

    pub fn has_side_effects(&self) -> bool {
        match self {
            Instruction::Apply { .. }
            | Instruction::StoreGlobal { .. }
            | Instruction::CondFail { .. }
            | Instruction::CheckedArith { .. }
            | Instruction::DebugValue { .. } => true,
            Instruction::Binary { op, .. } => op.can_trap(),
            _ => false,
        }
    }

    /// Constructs that the lowering stage rewrites away.
    pub fn is_high_level(&self) -> bool {
        matches!(
            self,
            Instruction::CheckedArith { .. } | Instruction::DebugValue { .. }
        )
    }

    pub fn opcode_name(&self) -> &'static str {
        match self {
            Instruction::IntegerLiteral { .. } => "integer_literal",
            Instruction::BoolLiteral { .. } => "bool_literal",
            Instruction::Binary { .. } => "binary",
            Instruction::CheckedArith { .. } => "checked_arith",
            Instruction::ArithWithOverflow { .. } => "arith_with_overflow",
            Instruction::Compare { .. } => "compare",
            Instruction::Not { .. } => "not",
            Instruction::Select { .. } => "select",
            Instruction::Convert { .. } => "convert",
            Instruction::Apply { .. } => "apply",
            Instruction::LoadGlobal { .. } => "load_global",
            Instruction::StoreGlobal { .. } => "store_global",
            Instruction::CondFail { .. } => "cond_fail",
            Instruction::DebugValue { .. } => "debug_value",
        }
    }
}
