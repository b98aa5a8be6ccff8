/*! The forward-only stage machine that prepares a module for code generation.
 *
 * `Raw` modules are checked and cleaned up into `Canonical` form; `Canonical` modules have their
 * high-level constructs rewritten into the small instruction set the Cranelift bridge understands.
 * Each step is deterministic, and lowering an already `Lowered` module does nothing.
 */

use crate::block::{BlockId, Terminator};
use crate::diagnostics::run_diagnostic_passes;
use crate::function::FunctionBody;
use crate::instructions::{CompareOp, Instruction};
use crate::module::Module;
use crate::stage::Stage;
use crate::{IrError, Result};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

pub const OVERFLOW_MESSAGE: &str = "arithmetic overflow";

/// Drives `module` through every remaining stage. On success the module is
/// `Lowered`.
pub fn lower_module(module: &mut Module) -> Result<()> {
    loop {
        match module.stage() {
            Stage::Raw => {
                let diagnostics = run_diagnostic_passes(module);
                if !diagnostics.is_empty() {
                    return Err(IrError::Diagnostics(diagnostics));
                }
                let pruned = prune_unreachable_blocks(module);
                debug!(module = %module.name, pruned, stage = %Stage::Canonical, "entering stage");
                module.set_stage(Stage::Canonical)?;
            }
            Stage::Canonical => {
                for function in module.functions.values_mut() {
                    if let Some(body) = function.body.as_mut() {
                        lower_body(body);
                    }
                }
                module.set_stage(Stage::Lowered)?;

                let leftovers = run_diagnostic_passes(module);
                if !leftovers.is_empty() {
                    return Err(IrError::Invariant(format!(
                        "lowering produced an ill-formed module: {}",
                        crate::diagnostics::summarize(&leftovers)
                    )));
                }
                debug!(module = %module.name, stage = %Stage::Lowered, "entering stage");
            }
            Stage::Lowered => return Ok(()),
        }
    }
}

/// Removes blocks that cannot be reached from the entry block and returns how
/// many were removed.
pub fn prune_unreachable_blocks(module: &mut Module) -> usize {
    let mut removed = 0;
    for function in module.functions.values_mut() {
        let Some(body) = function.body.as_mut() else {
            continue;
        };
        let mut reachable = HashSet::new();
        let mut worklist = VecDeque::from([body.entry_block]);
        while let Some(id) = worklist.pop_front() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(block) = body.get_block(id) {
                worklist.extend(block.successors());
            }
        }
        let before = body.blocks.len();
        body.blocks.retain(|id, _| reachable.contains(id));
        removed += before - body.blocks.len();
    }
    removed
}

fn lower_body(body: &mut FunctionBody) {
    let ids: Vec<BlockId> = body.blocks.keys().copied().collect();
    for id in ids {
        let Some(block) = body.get_block_mut(id) else {
            continue;
        };
        let original = std::mem::take(&mut block.instructions);
        let terminator = std::mem::replace(&mut block.terminator, Terminator::Invalid);

        let mut lowered = Vec::with_capacity(original.len());
        for inst in original {
            match inst {
                Instruction::CheckedArith {
                    result,
                    op,
                    signed,
                    ty,
                    left,
                    right,
                } => {
                    let overflow = body.fresh_value();
                    lowered.push(Instruction::ArithWithOverflow {
                        result,
                        overflow,
                        op,
                        signed,
                        ty,
                        left,
                        right,
                    });
                    lowered.push(Instruction::CondFail {
                        condition: overflow,
                        message: OVERFLOW_MESSAGE.to_string(),
                    });
                }
                Instruction::DebugValue { .. } => {}
                other => lowered.push(other),
            }
        }

        let terminator = match terminator {
            Terminator::Switch {
                value,
                ty,
                cases,
                default,
            } => lower_switch(body, id, &mut lowered, value, ty, cases, default),
            other => other,
        };

        if let Some(block) = body.get_block_mut(id) {
            block.instructions = lowered;
            block.terminator = terminator;
        }
    }
}

/// Expands a switch into a chain of equality tests. The first test lands in
/// the switching block itself; each further test gets its own block.
fn lower_switch(
    body: &mut FunctionBody,
    block: BlockId,
    first: &mut Vec<Instruction>,
    value: crate::values::ValueId,
    ty: crate::types::Type,
    cases: Vec<(i64, BlockId)>,
    default: BlockId,
) -> Terminator {
    if cases.is_empty() {
        return Terminator::Branch {
            target: default,
            args: Vec::new(),
        };
    }

    let mut current = block;
    let mut entry_terminator = None;
    let count = cases.len();
    for (index, (case, target)) in cases.into_iter().enumerate() {
        let literal = body.fresh_value();
        let matches = body.fresh_value();
        let test = [
            Instruction::IntegerLiteral {
                result: literal,
                ty,
                value: case,
            },
            Instruction::Compare {
                result: matches,
                op: CompareOp::Eq,
                ty,
                left: value,
                right: literal,
            },
        ];
        let fallthrough = if index + 1 == count {
            default
        } else {
            body.create_block()
        };
        let terminator = Terminator::CondBranch {
            condition: matches,
            then_block: target,
            then_args: Vec::new(),
            else_block: fallthrough,
            else_args: Vec::new(),
        };

        if current == block {
            first.extend(test);
            entry_terminator = Some(terminator);
        } else if let Some(chain) = body.get_block_mut(current) {
            chain.instructions.extend(test);
            chain.terminator = terminator;
        }
        current = fallthrough;
    }

    entry_terminator.unwrap_or(Terminator::Unreachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::instructions::OverflowOp;
    use crate::types::Type;

    fn checked_module() -> Module {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("inc", vec![Type::I32], Some(Type::I32));
        let x = fb.param(0);
        let mut entry = fb.entry_block();
        let one = entry.iconst(Type::I32, 1);
        let sum = entry.checked(OverflowOp::Add, true, Type::I32, x, one);
        entry.debug_value(sum, "sum");
        entry.ret(Some(sum));
        fb.build().unwrap();
        mb.build().unwrap()
    }

    #[test]
    fn test_checked_arith_becomes_overflow_and_cond_fail() {
        let mut module = checked_module();
        lower_module(&mut module).unwrap();

        let body = module.get_function("inc").unwrap().body.as_ref().unwrap();
        let entry = body.get_block(body.entry_block).unwrap();
        let names: Vec<&str> = entry.instructions.iter().map(|i| i.opcode_name()).collect();
        assert_eq!(
            names,
            vec!["integer_literal", "arith_with_overflow", "cond_fail"]
        );
        assert_eq!(module.stage(), Stage::Lowered);
    }

    #[test]
    fn test_switch_becomes_compare_chain() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("pick", vec![Type::I8], Some(Type::I8));
        let x = fb.param(0);
        let a = fb.create_block();
        let b = fb.create_block();
        let d = fb.create_block();
        fb.entry_block().switch(x, Type::I8, vec![(1, a), (2, b)], d);
        for (block, value) in [(a, 10), (b, 20), (d, 0)] {
            let mut bb = fb.switch_to_block(block).unwrap();
            let v = bb.iconst(Type::I8, value);
            bb.ret(Some(v));
        }
        fb.build().unwrap();
        let mut module = mb.build().unwrap();

        lower_module(&mut module).unwrap();

        let body = module.get_function("pick").unwrap().body.as_ref().unwrap();
        assert_eq!(body.blocks.len(), 5);
        assert!(body
            .blocks
            .values()
            .all(|block| !block.terminator.is_high_level()));
    }

    #[test]
    fn test_unreachable_blocks_are_pruned() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("f", vec![], None);
        let dead = fb.create_block();
        fb.entry_block().ret(None);
        fb.switch_to_block(dead).unwrap().unreachable();
        fb.build().unwrap();
        let mut module = mb.build().unwrap();

        lower_module(&mut module).unwrap();
        assert_eq!(module.get_function("f").unwrap().block_count(), 1);
    }
}
