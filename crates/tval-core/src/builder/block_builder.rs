use crate::block::{BlockId, BlockParam, Terminator};
use crate::function::FunctionBody;
use crate::instructions::{BinaryOp, CompareOp, ConvertKind, Instruction, OverflowOp};
use crate::types::Type;
use crate::values::ValueId;

/// Appends instructions to one block of a function body.
pub struct BlockBuilder<'a> {
    block: BlockId,
    body: &'a mut FunctionBody,
}

impl<'a> BlockBuilder<'a> {
    pub fn new(block: BlockId, body: &'a mut FunctionBody) -> Self {
        Self { block, body }
    }

    pub fn block_id(&self) -> BlockId {
        self.block
    }

    pub fn params(&self) -> Vec<ValueId> {
        self.body
            .get_block(self.block)
            .map_or_else(Vec::new, |b| b.params.iter().map(|p| p.value).collect())
    }

    pub fn add_param(&mut self, ty: Type) -> ValueId {
        let value = self.body.fresh_value();
        if let Some(block) = self.body.get_block_mut(self.block) {
            block.add_param(BlockParam::new(value, ty));
        }
        value
    }

    fn push(&mut self, inst: Instruction) {
        if let Some(block) = self.body.get_block_mut(self.block) {
            block.add_instruction(inst);
        }
    }

    fn terminate(&mut self, term: Terminator) {
        if let Some(block) = self.body.get_block_mut(self.block) {
            block.set_terminator(term);
        }
    }

    pub fn iconst(&mut self, ty: Type, value: i64) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::IntegerLiteral { result, ty, value });
        result
    }

    pub fn bconst(&mut self, value: bool) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::BoolLiteral { result, value });
        result
    }

    pub fn binary(&mut self, op: BinaryOp, ty: Type, left: ValueId, right: ValueId) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::Binary {
            result,
            op,
            ty,
            left,
            right,
        });
        result
    }

    pub fn add(&mut self, ty: Type, left: ValueId, right: ValueId) -> ValueId {
        self.binary(BinaryOp::Add, ty, left, right)
    }

    pub fn sub(&mut self, ty: Type, left: ValueId, right: ValueId) -> ValueId {
        self.binary(BinaryOp::Sub, ty, left, right)
    }

    pub fn mul(&mut self, ty: Type, left: ValueId, right: ValueId) -> ValueId {
        self.binary(BinaryOp::Mul, ty, left, right)
    }

    pub fn checked(
        &mut self,
        op: OverflowOp,
        signed: bool,
        ty: Type,
        left: ValueId,
        right: ValueId,
    ) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::CheckedArith {
            result,
            op,
            signed,
            ty,
            left,
            right,
        });
        result
    }

    /// Returns `(result, overflow)`.
    pub fn with_overflow(
        &mut self,
        op: OverflowOp,
        signed: bool,
        ty: Type,
        left: ValueId,
        right: ValueId,
    ) -> (ValueId, ValueId) {
        let result = self.body.fresh_value();
        let overflow = self.body.fresh_value();
        self.push(Instruction::ArithWithOverflow {
            result,
            overflow,
            op,
            signed,
            ty,
            left,
            right,
        });
        (result, overflow)
    }

    pub fn compare(&mut self, op: CompareOp, ty: Type, left: ValueId, right: ValueId) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::Compare {
            result,
            op,
            ty,
            left,
            right,
        });
        result
    }

    pub fn not(&mut self, ty: Type, operand: ValueId) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::Not {
            result,
            ty,
            operand,
        });
        result
    }

    pub fn select(
        &mut self,
        ty: Type,
        condition: ValueId,
        then_value: ValueId,
        else_value: ValueId,
    ) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::Select {
            result,
            ty,
            condition,
            then_value,
            else_value,
        });
        result
    }

    pub fn convert(&mut self, kind: ConvertKind, from: Type, to: Type, operand: ValueId) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::Convert {
            result,
            kind,
            from,
            to,
            operand,
        });
        result
    }

    pub fn apply(&mut self, callee: &str, args: Vec<ValueId>, result_ty: Option<Type>) -> Option<ValueId> {
        let result = result_ty.map(|ty| (self.body.fresh_value(), ty));
        self.push(Instruction::Apply {
            result,
            callee: callee.to_string(),
            args,
        });
        result.map(|(value, _)| value)
    }

    pub fn load_global(&mut self, global: &str, ty: Type) -> ValueId {
        let result = self.body.fresh_value();
        self.push(Instruction::LoadGlobal {
            result,
            ty,
            global: global.to_string(),
        });
        result
    }

    pub fn store_global(&mut self, global: &str, ty: Type, value: ValueId) {
        self.push(Instruction::StoreGlobal {
            global: global.to_string(),
            ty,
            value,
        });
    }

    pub fn cond_fail(&mut self, condition: ValueId, message: &str) {
        self.push(Instruction::CondFail {
            condition,
            message: message.to_string(),
        });
    }

    pub fn debug_value(&mut self, value: ValueId, name: &str) {
        self.push(Instruction::DebugValue {
            value,
            name: name.to_string(),
        });
    }

    pub fn jump(&mut self, target: BlockId, args: Vec<ValueId>) {
        self.terminate(Terminator::Branch { target, args });
    }

    pub fn branch(
        &mut self,
        condition: ValueId,
        then_block: BlockId,
        then_args: Vec<ValueId>,
        else_block: BlockId,
        else_args: Vec<ValueId>,
    ) {
        self.terminate(Terminator::CondBranch {
            condition,
            then_block,
            then_args,
            else_block,
            else_args,
        });
    }

    pub fn switch(&mut self, value: ValueId, ty: Type, cases: Vec<(i64, BlockId)>, default: BlockId) {
        self.terminate(Terminator::Switch {
            value,
            ty,
            cases,
            default,
        });
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.terminate(Terminator::Return(value));
    }

    pub fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }
}
