use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{self as clif_ir, ExternalName, GlobalValueData, InstructionData, Opcode};
use std::collections::HashMap;
use tracing::debug;
use tval_core::codegen::{
    LowLevelFunction, LowLevelModule, SymbolKind, SymbolTable, TargetDescriptor,
};

use crate::engine::EngineContext;
use crate::vir::{self, BinOp, BlockRef, Cond, ExtendKind, Inst, OverflowOp, Terminator, Type};
use crate::{Result, TranslateError};

/// Translates every defined function of `module`, in module order.
/// Declarations have nothing to compare and are skipped.
pub fn translate_module(module: &LowLevelModule, engine: &EngineContext) -> Result<vir::Module> {
    engine.check_target(&module.target)?;

    let mut translated = vir::Module::new(module.name.clone());
    for function in &module.functions {
        if function.is_declaration() {
            debug!(module = %module.name, function = %function.name, "skipping declaration");
            continue;
        }
        translated.push(translate_function(
            function,
            &module.target,
            &module.symbols,
            engine,
        )?);
    }

    debug!(module = %module.name, functions = translated.len(), "translated module");
    Ok(translated)
}

pub fn translate_function(
    function: &LowLevelFunction,
    target: &TargetDescriptor,
    symbols: &SymbolTable,
    engine: &EngineContext,
) -> Result<vir::Function> {
    engine.check_target(target)?;
    let func = function
        .func
        .as_ref()
        .ok_or_else(|| TranslateError::Declaration(function.name.clone()))?;

    let result = FunctionTranslator::new(&function.name, func, symbols).run();
    if let Err(err) = &result {
        engine.report(&function.name, &err.to_string());
    }
    result
}

struct FunctionTranslator<'a> {
    name: &'a str,
    func: &'a clif_ir::Function,
    symbols: &'a SymbolTable,
    values: HashMap<clif_ir::Value, vir::Value>,
    next_value: u32,
    blocks: HashMap<clif_ir::Block, BlockRef>,
    /// Results of `global_value`, which only ever feed loads and stores.
    addresses: HashMap<clif_ir::Value, String>,
}

impl<'a> FunctionTranslator<'a> {
    fn new(name: &'a str, func: &'a clif_ir::Function, symbols: &'a SymbolTable) -> Self {
        Self {
            name,
            func,
            symbols,
            values: HashMap::new(),
            next_value: 0,
            blocks: HashMap::new(),
            addresses: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<vir::Function> {
        let func = self.func;

        let params = func
            .signature
            .params
            .iter()
            .map(|p| self.clif_type(p.value_type))
            .collect::<Result<Vec<_>>>()?;
        let result = match func.signature.returns.as_slice() {
            [] => None,
            [ret] => Some(self.clif_type(ret.value_type)?),
            _ => return Err(self.unsupported("multiple return values")),
        };

        for (index, block) in func.layout.blocks().enumerate() {
            self.blocks.insert(block, BlockRef(index as u32));
        }

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in func.layout.blocks() {
            blocks.push(self.translate_block(block)?);
        }
        if blocks.is_empty() {
            return Err(self.unsupported("function has no blocks"));
        }

        Ok(vir::Function {
            name: self.name.to_string(),
            params,
            result,
            blocks,
        })
    }

    fn translate_block(&mut self, block: clif_ir::Block) -> Result<vir::Block> {
        let func = self.func;
        let id = self.block_ref(block)?;

        let mut params = Vec::new();
        for &param in func.dfg.block_params(block) {
            let ty = self.value_type(param)?;
            params.push((self.value(param), ty));
        }

        let mut insts = Vec::new();
        let mut term = None;
        for inst in func.layout.block_insts(block) {
            if term.is_some() {
                return Err(self.unsupported(format!("instruction after terminator in {}", block)));
            }
            if func.dfg.insts[inst].opcode().is_terminator() {
                term = Some(self.translate_terminator(inst)?);
            } else {
                self.translate_inst(inst, &mut insts)?;
            }
        }

        let term = term.ok_or_else(|| self.unsupported(format!("{} has no terminator", block)))?;
        Ok(vir::Block {
            id,
            params,
            insts,
            term,
        })
    }

    fn translate_inst(&mut self, inst: clif_ir::Inst, out: &mut Vec<Inst>) -> Result<()> {
        let func = self.func;
        let dfg = &func.dfg;
        let results = dfg.inst_results(inst);

        match &dfg.insts[inst] {
            InstructionData::UnaryImm {
                opcode: Opcode::Iconst,
                imm,
            } => {
                let ty = self.result_type(results)?;
                out.push(Inst::Const {
                    dst: self.result(results, 0)?,
                    ty,
                    bits: imm.bits() as u64 & ty.mask(),
                });
            }
            InstructionData::Binary { opcode, args } => {
                let ty = self.value_type(args[0])?;
                let lhs = self.value(args[0]);
                let rhs = self.value(args[1]);
                if let Some(op) = binary_op(*opcode) {
                    out.push(Inst::Binary {
                        dst: self.result(results, 0)?,
                        op,
                        ty,
                        lhs,
                        rhs,
                    });
                } else if let Some(op) = overflow_op(*opcode) {
                    out.push(Inst::Overflow {
                        dst: self.result(results, 0)?,
                        flag: self.result(results, 1)?,
                        op,
                        ty,
                        lhs,
                        rhs,
                    });
                } else {
                    return Err(self.unsupported(format!("instruction {}", opcode)));
                }
            }
            InstructionData::BinaryImm64 { opcode, arg, imm } => {
                let (op, reversed) = immediate_op(*opcode)
                    .ok_or_else(|| self.unsupported(format!("instruction {}", opcode)))?;
                let ty = self.value_type(*arg)?;
                let arg = self.value(*arg);
                let constant = self.fresh();
                out.push(Inst::Const {
                    dst: constant,
                    ty,
                    bits: imm.bits() as u64 & ty.mask(),
                });
                let (lhs, rhs) = if reversed {
                    (constant, arg)
                } else {
                    (arg, constant)
                };
                out.push(Inst::Binary {
                    dst: self.result(results, 0)?,
                    op,
                    ty,
                    lhs,
                    rhs,
                });
            }
            InstructionData::Unary { opcode, arg } => {
                let from = self.value_type(*arg)?;
                let to = self.result_type(results)?;
                let arg = self.value(*arg);
                let dst = self.result(results, 0)?;
                let translated = match opcode {
                    Opcode::Bnot => Inst::Not { dst, ty: to, arg },
                    Opcode::Ineg => Inst::Neg { dst, ty: to, arg },
                    Opcode::Uextend => Inst::Extend {
                        dst,
                        kind: ExtendKind::Zero,
                        from,
                        to,
                        arg,
                    },
                    Opcode::Sextend => Inst::Extend {
                        dst,
                        kind: ExtendKind::Sign,
                        from,
                        to,
                        arg,
                    },
                    Opcode::Ireduce => Inst::Extend {
                        dst,
                        kind: ExtendKind::Truncate,
                        from,
                        to,
                        arg,
                    },
                    other => return Err(self.unsupported(format!("instruction {}", other))),
                };
                out.push(translated);
            }
            InstructionData::IntCompare { cond, args, .. } => {
                let ty = self.value_type(args[0])?;
                let lhs = self.value(args[0]);
                let rhs = self.value(args[1]);
                out.push(Inst::Icmp {
                    dst: self.result(results, 0)?,
                    cond: int_cond(*cond),
                    ty,
                    lhs,
                    rhs,
                });
            }
            InstructionData::Ternary {
                opcode: Opcode::Select,
                args,
            } => {
                let ty = self.result_type(results)?;
                let cond = self.value(args[0]);
                let if_true = self.value(args[1]);
                let if_false = self.value(args[2]);
                out.push(Inst::Select {
                    dst: self.result(results, 0)?,
                    ty,
                    cond,
                    if_true,
                    if_false,
                });
            }
            InstructionData::Call { func_ref, args, .. } => {
                let callee = self.symbol(&dfg.ext_funcs[*func_ref].name, SymbolKind::Function)?;
                let args = args
                    .as_slice(&dfg.value_lists)
                    .iter()
                    .map(|&a| self.value(a))
                    .collect();
                let mut call_results = Vec::with_capacity(results.len());
                for &r in results {
                    let ty = self.value_type(r)?;
                    call_results.push((self.value(r), ty));
                }
                out.push(Inst::Call {
                    results: call_results,
                    callee,
                    args,
                });
            }
            InstructionData::UnaryGlobalValue {
                opcode: Opcode::GlobalValue,
                global_value,
            } => {
                let name = match &func.global_values[*global_value] {
                    GlobalValueData::Symbol { name, offset, .. } if offset.bits() == 0 => {
                        self.symbol(name, SymbolKind::Data)?
                    }
                    other => {
                        return Err(self.unsupported(format!("global value {:?}", other)));
                    }
                };
                let address = results
                    .first()
                    .copied()
                    .ok_or_else(|| self.unsupported("global_value without a result"))?;
                self.addresses.insert(dfg.resolve_aliases(address), name);
            }
            InstructionData::Load {
                opcode: Opcode::Load,
                arg,
                offset,
                ..
            } => {
                if i32::from(*offset) != 0 {
                    return Err(self.unsupported("load with a non-zero offset"));
                }
                let global = self.address(*arg)?;
                let ty = self.result_type(results)?;
                out.push(Inst::Load {
                    dst: self.result(results, 0)?,
                    ty,
                    global,
                });
            }
            InstructionData::Store {
                opcode: Opcode::Store,
                args,
                offset,
                ..
            } => {
                if i32::from(*offset) != 0 {
                    return Err(self.unsupported("store with a non-zero offset"));
                }
                let global = self.address(args[1])?;
                let ty = self.value_type(args[0])?;
                out.push(Inst::Store {
                    global,
                    ty,
                    value: self.value(args[0]),
                });
            }
            InstructionData::CondTrap { opcode, arg, code } => {
                let ty = self.value_type(*arg)?;
                let cond = self.value(*arg);
                let code = code.to_string();
                match opcode {
                    Opcode::Trapnz => out.push(Inst::TrapIf { cond, code }),
                    Opcode::Trapz => {
                        let zero = self.fresh();
                        let is_zero = self.fresh();
                        out.push(Inst::Const {
                            dst: zero,
                            ty,
                            bits: 0,
                        });
                        out.push(Inst::Icmp {
                            dst: is_zero,
                            cond: Cond::Eq,
                            ty,
                            lhs: cond,
                            rhs: zero,
                        });
                        out.push(Inst::TrapIf {
                            cond: is_zero,
                            code,
                        });
                    }
                    other => return Err(self.unsupported(format!("instruction {}", other))),
                }
            }
            other => {
                return Err(self.unsupported(format!("instruction {}", other.opcode())));
            }
        }
        Ok(())
    }

    fn translate_terminator(&mut self, inst: clif_ir::Inst) -> Result<Terminator> {
        let func = self.func;
        let dfg = &func.dfg;

        match &dfg.insts[inst] {
            InstructionData::Jump { destination, .. } => {
                let target = self.block_ref(destination.block(&dfg.value_lists))?;
                let args = self.values(destination.args_slice(&dfg.value_lists));
                Ok(Terminator::Jump { target, args })
            }
            InstructionData::Brif { arg, blocks, .. } => {
                let cond = self.value(*arg);
                let then_target = self.block_ref(blocks[0].block(&dfg.value_lists))?;
                let then_args = self.values(blocks[0].args_slice(&dfg.value_lists));
                let else_target = self.block_ref(blocks[1].block(&dfg.value_lists))?;
                let else_args = self.values(blocks[1].args_slice(&dfg.value_lists));
                Ok(Terminator::Branch {
                    cond,
                    then_target,
                    then_args,
                    else_target,
                    else_args,
                })
            }
            InstructionData::MultiAry {
                opcode: Opcode::Return,
                ..
            } => Ok(Terminator::Return(self.values(dfg.inst_args(inst)))),
            InstructionData::Trap { code, .. } => Ok(Terminator::Trap {
                code: code.to_string(),
            }),
            other => Err(self.unsupported(format!("terminator {}", other.opcode()))),
        }
    }

    /// Values are numbered the first time they are seen, walking blocks in
    /// layout order.
    fn value(&mut self, value: clif_ir::Value) -> vir::Value {
        let value = self.func.dfg.resolve_aliases(value);
        if let Some(&v) = self.values.get(&value) {
            return v;
        }
        let v = self.fresh();
        self.values.insert(value, v);
        v
    }

    fn values(&mut self, values: &[clif_ir::Value]) -> Vec<vir::Value> {
        values.iter().map(|&v| self.value(v)).collect()
    }

    fn fresh(&mut self) -> vir::Value {
        let v = vir::Value(self.next_value);
        self.next_value += 1;
        v
    }

    fn result(&mut self, results: &[clif_ir::Value], index: usize) -> Result<vir::Value> {
        let value = results
            .get(index)
            .copied()
            .ok_or_else(|| self.unsupported(format!("missing result #{}", index)))?;
        Ok(self.value(value))
    }

    fn result_type(&self, results: &[clif_ir::Value]) -> Result<Type> {
        let value = results
            .first()
            .copied()
            .ok_or_else(|| self.unsupported("instruction has no result"))?;
        self.value_type(value)
    }

    fn value_type(&self, value: clif_ir::Value) -> Result<Type> {
        self.clif_type(self.func.dfg.value_type(value))
    }

    fn clif_type(&self, ty: clif_ir::Type) -> Result<Type> {
        Type::from_cranelift(ty).ok_or_else(|| self.unsupported(format!("type {}", ty)))
    }

    fn block_ref(&self, block: clif_ir::Block) -> Result<BlockRef> {
        self.blocks
            .get(&block)
            .copied()
            .ok_or_else(|| self.unsupported(format!("branch to {} outside the layout", block)))
    }

    fn address(&self, value: clif_ir::Value) -> Result<String> {
        let value = self.func.dfg.resolve_aliases(value);
        self.addresses
            .get(&value)
            .cloned()
            .ok_or_else(|| self.unsupported("memory access through a computed address"))
    }

    fn symbol(&self, name: &ExternalName, expected: SymbolKind) -> Result<String> {
        let unknown = || TranslateError::UnknownSymbol {
            function: self.name.to_string(),
            symbol: format!("{:?}", name),
        };
        let ExternalName::User(reference) = name else {
            return Err(unknown());
        };
        let user = self
            .func
            .params
            .user_named_funcs()
            .get(*reference)
            .ok_or_else(unknown)?;
        match self.symbols.resolve(user) {
            Some((kind, symbol)) if kind == expected => Ok(symbol.to_string()),
            _ => Err(unknown()),
        }
    }

    fn unsupported(&self, detail: impl Into<String>) -> TranslateError {
        TranslateError::unsupported(self.name, detail)
    }
}

fn binary_op(opcode: Opcode) -> Option<BinOp> {
    let op = match opcode {
        Opcode::Iadd => BinOp::Add,
        Opcode::Isub => BinOp::Sub,
        Opcode::Imul => BinOp::Mul,
        Opcode::Udiv => BinOp::UDiv,
        Opcode::Sdiv => BinOp::SDiv,
        Opcode::Urem => BinOp::URem,
        Opcode::Srem => BinOp::SRem,
        Opcode::Band => BinOp::And,
        Opcode::Bor => BinOp::Or,
        Opcode::Bxor => BinOp::Xor,
        Opcode::Ishl => BinOp::Shl,
        Opcode::Ushr => BinOp::LShr,
        Opcode::Sshr => BinOp::AShr,
        _ => return None,
    };
    Some(op)
}

fn overflow_op(opcode: Opcode) -> Option<OverflowOp> {
    let op = match opcode {
        Opcode::SaddOverflow => OverflowOp::SAdd,
        Opcode::UaddOverflow => OverflowOp::UAdd,
        Opcode::SsubOverflow => OverflowOp::SSub,
        Opcode::UsubOverflow => OverflowOp::USub,
        Opcode::SmulOverflow => OverflowOp::SMul,
        Opcode::UmulOverflow => OverflowOp::UMul,
        _ => return None,
    };
    Some(op)
}

/// The binary operation behind an `_imm` opcode, and whether the immediate
/// is the left operand.
fn immediate_op(opcode: Opcode) -> Option<(BinOp, bool)> {
    let op = match opcode {
        Opcode::IaddImm => (BinOp::Add, false),
        Opcode::IrsubImm => (BinOp::Sub, true),
        Opcode::ImulImm => (BinOp::Mul, false),
        Opcode::UdivImm => (BinOp::UDiv, false),
        Opcode::SdivImm => (BinOp::SDiv, false),
        Opcode::UremImm => (BinOp::URem, false),
        Opcode::SremImm => (BinOp::SRem, false),
        Opcode::BandImm => (BinOp::And, false),
        Opcode::BorImm => (BinOp::Or, false),
        Opcode::BxorImm => (BinOp::Xor, false),
        Opcode::IshlImm => (BinOp::Shl, false),
        Opcode::UshrImm => (BinOp::LShr, false),
        Opcode::SshrImm => (BinOp::AShr, false),
        _ => return None,
    };
    Some(op)
}

fn int_cond(cc: IntCC) -> Cond {
    match cc {
        IntCC::Equal => Cond::Eq,
        IntCC::NotEqual => Cond::Ne,
        IntCC::SignedLessThan => Cond::Slt,
        IntCC::SignedLessThanOrEqual => Cond::Sle,
        IntCC::SignedGreaterThan => Cond::Sgt,
        IntCC::SignedGreaterThanOrEqual => Cond::Sge,
        IntCC::UnsignedLessThan => Cond::Ult,
        IntCC::UnsignedLessThanOrEqual => Cond::Ule,
        IntCC::UnsignedGreaterThan => Cond::Ugt,
        IntCC::UnsignedGreaterThanOrEqual => Cond::Uge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_ops_keep_operand_order() {
        assert_eq!(immediate_op(Opcode::IaddImm), Some((BinOp::Add, false)));
        assert_eq!(immediate_op(Opcode::IrsubImm), Some((BinOp::Sub, true)));
        assert_eq!(immediate_op(Opcode::Iadd), None);
    }

    #[test]
    fn test_overflow_ops_are_not_plain_binaries() {
        assert_eq!(binary_op(Opcode::SaddOverflow), None);
        assert_eq!(overflow_op(Opcode::SaddOverflow), Some(OverflowOp::SAdd));
        assert_eq!(overflow_op(Opcode::Iadd), None);
    }
}
