use crate::instructions::Instruction;
use crate::types::Type;
use crate::values::ValueId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub params: Vec<BlockParam>,
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            params: Vec::new(),
            instructions: Vec::new(),
            terminator: Terminator::Invalid,
        }
    }

    pub fn add_param(&mut self, param: BlockParam) {
        self.params.push(param);
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn set_terminator(&mut self, term: Terminator) {
        self.terminator = term;
    }

    pub fn is_terminated(&self) -> bool {
        !matches!(self.terminator, Terminator::Invalid)
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator.successors()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParam {
    pub value: ValueId,
    pub ty: Type,
}

impl BlockParam {
    pub fn new(value: ValueId, ty: Type) -> Self {
        Self { value, ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    Branch {
        target: BlockId,
        args: Vec<ValueId>,
    },
    CondBranch {
        condition: ValueId,
        then_block: BlockId,
        then_args: Vec<ValueId>,
        else_block: BlockId,
        else_args: Vec<ValueId>,
    },

    /// Multi-way branch on an integer. Only legal before lowering.
    Switch {
        value: ValueId,
        ty: Type,
        cases: Vec<(i64, BlockId)>,
        default: BlockId,
    },

    Return(Option<ValueId>),

    Unreachable,

    Invalid,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Branch { target, .. } => vec![*target],
            Terminator::CondBranch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Switch { cases, default, .. } => {
                let mut blocks: Vec<BlockId> = cases.iter().map(|(_, block)| *block).collect();
                blocks.push(*default);
                blocks
            }
            Terminator::Return(_) | Terminator::Unreachable | Terminator::Invalid => vec![],
        }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Terminator::Branch { args, .. } => args.clone(),
            Terminator::CondBranch {
                condition,
                then_args,
                else_args,
                ..
            } => {
                let mut values = vec![*condition];
                values.extend(then_args.iter().copied());
                values.extend(else_args.iter().copied());
                values
            }
            Terminator::Switch { value, .. } => vec![*value],
            Terminator::Return(value) => value.iter().copied().collect(),
            Terminator::Unreachable | Terminator::Invalid => vec![],
        }
    }

    /// The edges leaving this terminator with the arguments passed along each.
    pub fn edges(&self) -> Vec<(BlockId, Vec<ValueId>)> {
        match self {
            Terminator::Branch { target, args } => vec![(*target, args.clone())],
            Terminator::CondBranch {
                then_block,
                then_args,
                else_block,
                else_args,
                ..
            } => vec![
                (*then_block, then_args.clone()),
                (*else_block, else_args.clone()),
            ],
            Terminator::Switch { cases, default, .. } => {
                let mut edges: Vec<(BlockId, Vec<ValueId>)> =
                    cases.iter().map(|(_, block)| (*block, Vec::new())).collect();
                edges.push((*default, Vec::new()));
                edges
            }
            Terminator::Return(_) | Terminator::Unreachable | Terminator::Invalid => vec![],
        }
    }

    pub fn map(
        &self,
        values: &mut impl FnMut(ValueId) -> ValueId,
        blocks: &mut impl FnMut(BlockId) -> BlockId,
    ) -> Terminator {
        match self {
            Terminator::Branch { target, args } => Terminator::Branch {
                target: blocks(*target),
                args: args.iter().map(|arg| values(*arg)).collect(),
            },
            Terminator::CondBranch {
                condition,
                then_block,
                then_args,
                else_block,
                else_args,
            } => Terminator::CondBranch {
                condition: values(*condition),
                then_block: blocks(*then_block),
                then_args: then_args.iter().map(|arg| values(*arg)).collect(),
                else_block: blocks(*else_block),
                else_args: else_args.iter().map(|arg| values(*arg)).collect(),
            },
            Terminator::Switch {
                value,
                ty,
                cases,
                default,
            } => Terminator::Switch {
                value: values(*value),
                ty: *ty,
                cases: cases
                    .iter()
                    .map(|(case, block)| (*case, blocks(*block)))
                    .collect(),
                default: blocks(*default),
            },
            Terminator::Return(value) => Terminator::Return(value.map(|v| values(v))),
            Terminator::Unreachable => Terminator::Unreachable,
            Terminator::Invalid => Terminator::Invalid,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Terminator::Return(_))
    }

    pub fn is_high_level(&self) -> bool {
        matches!(self, Terminator::Switch { .. })
    }
}
