use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{self as clif_ir, InstBuilder, MemFlags, TrapCode};
use cranelift_frontend::FunctionBuilder;
use cranelift_module::Module as _;

use super::context::CodegenContext;
use super::module::SymbolRefs;
use crate::block::Terminator;
use crate::instructions::{BinaryOp, CompareOp, ConvertKind, Instruction, OverflowOp};
use crate::types::Type;
use crate::{IrError, Result};

/// Trap raised by a failed `cond_fail`.
pub const COND_FAIL_TRAP: u8 = 1;
/// Trap raised when control reaches an `unreachable` terminator.
pub const UNREACHABLE_TRAP: u8 = 2;

pub fn lower_instruction(
    inst: &Instruction,
    ctx: &mut CodegenContext,
    builder: &mut FunctionBuilder,
    symbols: &mut SymbolRefs<'_>,
) -> Result<()> {
    match inst {
        Instruction::IntegerLiteral { result, ty, value } => {
            let res = builder.ins().iconst(ty.to_cranelift(), truncate_imm(*value, *ty));
            ctx.define(*result, res);
        }
        Instruction::BoolLiteral { result, value } => {
            let res = builder.ins().iconst(Type::Bool.to_cranelift(), i64::from(*value));
            ctx.define(*result, res);
        }
        Instruction::Binary {
            result,
            op,
            left,
            right,
            ..
        } => {
            let left = ctx.value(*left)?;
            let right = ctx.value(*right)?;
            let ins = builder.ins();
            let res = match op {
                BinaryOp::Add => ins.iadd(left, right),
                BinaryOp::Sub => ins.isub(left, right),
                BinaryOp::Mul => ins.imul(left, right),
                BinaryOp::UDiv => ins.udiv(left, right),
                BinaryOp::SDiv => ins.sdiv(left, right),
                BinaryOp::URem => ins.urem(left, right),
                BinaryOp::SRem => ins.srem(left, right),
                BinaryOp::And => ins.band(left, right),
                BinaryOp::Or => ins.bor(left, right),
                BinaryOp::Xor => ins.bxor(left, right),
                BinaryOp::Shl => ins.ishl(left, right),
                BinaryOp::LShr => ins.ushr(left, right),
                BinaryOp::AShr => ins.sshr(left, right),
            };
            ctx.define(*result, res);
        }
        Instruction::ArithWithOverflow {
            result,
            overflow,
            op,
            signed,
            left,
            right,
            ..
        } => {
            let left = ctx.value(*left)?;
            let right = ctx.value(*right)?;
            let ins = builder.ins();
            let (res, flag) = match (op, signed) {
                (OverflowOp::Add, true) => ins.sadd_overflow(left, right),
                (OverflowOp::Add, false) => ins.uadd_overflow(left, right),
                (OverflowOp::Sub, true) => ins.ssub_overflow(left, right),
                (OverflowOp::Sub, false) => ins.usub_overflow(left, right),
                (OverflowOp::Mul, true) => ins.smul_overflow(left, right),
                (OverflowOp::Mul, false) => ins.umul_overflow(left, right),
            };
            ctx.define(*result, res);
            ctx.define(*overflow, flag);
        }
        Instruction::CheckedArith { .. } | Instruction::DebugValue { .. } => {
            return Err(IrError::CodegenError(format!(
                "{} must be lowered before code generation",
                inst.opcode_name()
            )));
        }
        Instruction::Compare {
            result,
            op,
            left,
            right,
            ..
        } => {
            let left = ctx.value(*left)?;
            let right = ctx.value(*right)?;
            let res = builder.ins().icmp(int_cc(*op), left, right);
            ctx.define(*result, res);
        }
        Instruction::Not {
            result,
            ty,
            operand,
        } => {
            let operand = ctx.value(*operand)?;
            let res = if *ty == Type::Bool {
                builder.ins().bxor_imm(operand, 1)
            } else {
                builder.ins().bnot(operand)
            };
            ctx.define(*result, res);
        }
        Instruction::Select {
            result,
            condition,
            then_value,
            else_value,
            ..
        } => {
            let cond = ctx.value(*condition)?;
            let then_v = ctx.value(*then_value)?;
            let else_v = ctx.value(*else_value)?;
            let res = builder.ins().select(cond, then_v, else_v);
            ctx.define(*result, res);
        }
        Instruction::Convert {
            result,
            kind,
            from,
            to,
            operand,
        } => {
            let value = ctx.value(*operand)?;
            let res = lower_convert(builder, *kind, *from, *to, value)?;
            ctx.define(*result, res);
        }
        Instruction::Apply {
            result,
            callee,
            args,
        } => {
            let func_id = symbols.functions.get(callee).copied().ok_or_else(|| {
                IrError::CodegenError(format!("call to undeclared function @{}", callee))
            })?;
            let func_ref = symbols.objects.declare_func_in_func(func_id, builder.func);
            let args = ctx.values(args)?;
            let call = builder.ins().call(func_ref, &args);
            if let Some((value, _)) = result {
                let res = builder.inst_results(call).first().copied().ok_or_else(|| {
                    IrError::CodegenError(format!("@{} returns no value", callee))
                })?;
                ctx.define(*value, res);
            }
        }
        Instruction::LoadGlobal { result, ty, global } => {
            let addr = global_address(builder, symbols, global)?;
            let res = builder
                .ins()
                .load(ty.to_cranelift(), MemFlags::trusted(), addr, 0);
            ctx.define(*result, res);
        }
        Instruction::StoreGlobal { global, value, .. } => {
            let value = ctx.value(*value)?;
            let addr = global_address(builder, symbols, global)?;
            builder.ins().store(MemFlags::trusted(), value, addr, 0);
        }
        Instruction::CondFail { condition, .. } => {
            let cond = ctx.value(*condition)?;
            builder
                .ins()
                .trapnz(cond, TrapCode::unwrap_user(COND_FAIL_TRAP));
        }
    }
    Ok(())
}

pub fn lower_terminator(
    term: &Terminator,
    ctx: &CodegenContext,
    builder: &mut FunctionBuilder,
) -> Result<()> {
    match term {
        Terminator::Branch { target, args } => {
            let block = ctx.block(*target)?;
            let args = ctx.values(args)?;
            builder.ins().jump(block, &args);
        }
        Terminator::CondBranch {
            condition,
            then_block,
            then_args,
            else_block,
            else_args,
        } => {
            let cond = ctx.value(*condition)?;
            let then_dest = ctx.block(*then_block)?;
            let else_dest = ctx.block(*else_block)?;
            let then_args = ctx.values(then_args)?;
            let else_args = ctx.values(else_args)?;
            builder
                .ins()
                .brif(cond, then_dest, &then_args, else_dest, &else_args);
        }
        Terminator::Return(value) => match value {
            Some(v) => {
                let v = ctx.value(*v)?;
                builder.ins().return_(&[v]);
            }
            None => {
                builder.ins().return_(&[]);
            }
        },
        Terminator::Unreachable => {
            builder.ins().trap(TrapCode::unwrap_user(UNREACHABLE_TRAP));
        }
        Terminator::Switch { .. } => {
            return Err(IrError::CodegenError(
                "switch must be lowered before code generation".to_string(),
            ));
        }
        Terminator::Invalid => {
            return Err(IrError::CodegenError(
                "block has no terminator".to_string(),
            ));
        }
    }
    Ok(())
}

fn lower_convert(
    builder: &mut FunctionBuilder,
    kind: ConvertKind,
    from: Type,
    to: Type,
    value: clif_ir::Value,
) -> Result<clif_ir::Value> {
    let from_clif = from.to_cranelift();
    let to_clif = to.to_cranelift();
    if to == Type::Bool {
        return Err(IrError::CodegenError(format!(
            "cannot {} from {} to bool",
            kind, from
        )));
    }
    let res = match kind {
        ConvertKind::ZeroExtend if from_clif == to_clif => value,
        ConvertKind::ZeroExtend => builder.ins().uextend(to_clif, value),
        // A bool is carried as 0 or 1, so widening it with sign means negating.
        ConvertKind::SignExtend if from == Type::Bool => {
            let widened = if from_clif == to_clif {
                value
            } else {
                builder.ins().uextend(to_clif, value)
            };
            builder.ins().ineg(widened)
        }
        ConvertKind::SignExtend => builder.ins().sextend(to_clif, value),
        ConvertKind::Truncate => builder.ins().ireduce(to_clif, value),
    };
    Ok(res)
}

fn global_address(
    builder: &mut FunctionBuilder,
    symbols: &mut SymbolRefs<'_>,
    global: &str,
) -> Result<clif_ir::Value> {
    let data_id = symbols.data.get(global).copied().ok_or_else(|| {
        IrError::CodegenError(format!("access to undeclared global @{}", global))
    })?;
    let gv = symbols.objects.declare_data_in_func(data_id, builder.func);
    Ok(builder.ins().global_value(symbols.pointer_type, gv))
}

fn int_cc(op: CompareOp) -> IntCC {
    match op {
        CompareOp::Eq => IntCC::Equal,
        CompareOp::Ne => IntCC::NotEqual,
        CompareOp::Slt => IntCC::SignedLessThan,
        CompareOp::Sle => IntCC::SignedLessThanOrEqual,
        CompareOp::Sgt => IntCC::SignedGreaterThan,
        CompareOp::Sge => IntCC::SignedGreaterThanOrEqual,
        CompareOp::Ult => IntCC::UnsignedLessThan,
        CompareOp::Ule => IntCC::UnsignedLessThanOrEqual,
        CompareOp::Ugt => IntCC::UnsignedGreaterThan,
        CompareOp::Uge => IntCC::UnsignedGreaterThanOrEqual,
    }
}

/// Cranelift wants narrow immediates zero-extended to 64 bits.
fn truncate_imm(value: i64, ty: Type) -> i64 {
    match ty.bits() {
        64 => value,
        bits => ((value as u64) & ((1u64 << bits) - 1)) as i64,
    }
}
