/*! Verification IR: the representation the equivalence engine reasons about.
 *
 * Every value has a fixed-width integer type, every block lists its parameters, and every side
 * effect the engine must observe (calls, global accesses, traps) is an explicit instruction. Values
 * are written `%N` and blocks `^N`, both numbered in layout order.
 */

mod display;
mod types;

pub use display::FunctionBody;
pub use types::{BinOp, Cond, ExtendKind, OverflowOp, Type};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(pub u32);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(pub u32);

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    Const {
        dst: Value,
        ty: Type,
        /// Bit pattern, zero-extended from the type's width.
        bits: u64,
    },
    Binary {
        dst: Value,
        op: BinOp,
        ty: Type,
        lhs: Value,
        rhs: Value,
    },
    Overflow {
        dst: Value,
        flag: Value,
        op: OverflowOp,
        ty: Type,
        lhs: Value,
        rhs: Value,
    },
    Not {
        dst: Value,
        ty: Type,
        arg: Value,
    },
    Neg {
        dst: Value,
        ty: Type,
        arg: Value,
    },
    Icmp {
        dst: Value,
        cond: Cond,
        ty: Type,
        lhs: Value,
        rhs: Value,
    },
    Select {
        dst: Value,
        ty: Type,
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
    Extend {
        dst: Value,
        kind: ExtendKind,
        from: Type,
        to: Type,
        arg: Value,
    },
    Call {
        results: Vec<(Value, Type)>,
        callee: String,
        args: Vec<Value>,
    },
    Load {
        dst: Value,
        ty: Type,
        global: String,
    },
    Store {
        global: String,
        ty: Type,
        value: Value,
    },
    /// Traps with `code` when `cond` is non-zero.
    TrapIf {
        cond: Value,
        code: String,
    },
}

impl Inst {
    pub fn results(&self) -> Vec<Value> {
        match self {
            Inst::Const { dst, .. }
            | Inst::Binary { dst, .. }
            | Inst::Not { dst, .. }
            | Inst::Neg { dst, .. }
            | Inst::Icmp { dst, .. }
            | Inst::Select { dst, .. }
            | Inst::Extend { dst, .. }
            | Inst::Load { dst, .. } => vec![*dst],
            Inst::Overflow { dst, flag, .. } => vec![*dst, *flag],
            Inst::Call { results, .. } => results.iter().map(|(v, _)| *v).collect(),
            Inst::Store { .. } | Inst::TrapIf { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Jump {
        target: BlockRef,
        args: Vec<Value>,
    },
    Branch {
        cond: Value,
        then_target: BlockRef,
        then_args: Vec<Value>,
        else_target: BlockRef,
        else_args: Vec<Value>,
    },
    Return(Vec<Value>),
    Trap {
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockRef,
    pub params: Vec<(Value, Type)>,
    pub insts: Vec<Inst>,
    pub term: Terminator,
}

/// A translated function. The first block is the entry; its parameters are
/// the function's parameters.
///
/// Functions are moved between containers, never copied.
#[derive(Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Type>,
    pub result: Option<Type>,
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn block(&self, id: BlockRef) -> Option<&Block> {
        self.blocks.get(id.0 as usize).filter(|b| b.id == id)
    }

    /// Total width in bits of all parameters.
    pub fn input_bits(&self) -> u32 {
        self.params.iter().map(|t| u32::from(t.bits())).sum()
    }

    /// Names of the functions this one calls, in first-call order.
    pub fn callees(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for inst in self.blocks.iter().flat_map(|b| &b.insts) {
            if let Inst::Call { callee, .. } = inst {
                if !names.contains(&callee.as_str()) {
                    names.push(callee);
                }
            }
        }
        names
    }

    /// Globals read or written by this function, in first-access order.
    pub fn globals(&self) -> Vec<(&str, Type)> {
        let mut globals: Vec<(&str, Type)> = Vec::new();
        for inst in self.blocks.iter().flat_map(|b| &b.insts) {
            let access = match inst {
                Inst::Load { global, ty, .. } | Inst::Store { global, ty, .. } => {
                    Some((global.as_str(), *ty))
                }
                _ => None,
            };
            if let Some(access) = access {
                if !globals.iter().any(|(name, _)| *name == access.0) {
                    globals.push(access);
                }
            }
        }
        globals
    }

    /// Printed form without the function name, so renamed copies compare equal.
    pub fn body(&self) -> FunctionBody<'_> {
        FunctionBody(self)
    }
}

/// Translated functions in module order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn push(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn into_functions(self) -> Vec<Function> {
        self.functions
    }
}
