use crate::function::FunctionBody;
use crate::module::Module;
use crate::pass::{ModulePass, PassContext};
use crate::values::ValueId;
use anyhow::Result;
use std::collections::HashSet;
use tracing::debug;

/// Removes side-effect-free instructions whose results are never used.
#[derive(Debug, Default)]
pub struct DeadCodeElimination {
    removed: usize,
}

impl DeadCodeElimination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl ModulePass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn description(&self) -> &'static str {
        "Remove unused side-effect-free instructions"
    }

    fn run(&mut self, mut module: Module, _ctx: &PassContext) -> Result<Module> {
        for function in module.functions.values_mut() {
            if let Some(body) = function.body.as_mut() {
                self.removed += sweep(body);
            }
        }
        debug!(module = %module.name, removed = self.removed, "dead code elimination done");
        Ok(module)
    }
}

fn sweep(body: &mut FunctionBody) -> usize {
    let mut removed = 0;
    loop {
        let used: HashSet<ValueId> = body
            .blocks
            .values()
            .flat_map(|block| {
                block
                    .instructions
                    .iter()
                    .flat_map(|inst| inst.operands())
                    .chain(block.terminator.operands())
            })
            .collect();

        let mut changed = 0;
        for block in body.blocks.values_mut() {
            let before = block.instructions.len();
            block.instructions.retain(|inst| {
                inst.has_side_effects()
                    || inst
                        .definitions()
                        .iter()
                        .any(|(value, _)| used.contains(value))
            });
            changed += before - block.instructions.len();
        }

        if changed == 0 {
            return removed;
        }
        removed += changed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::types::Type;

    #[test]
    fn test_unused_chain_is_removed() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("f", vec![Type::I32], Some(Type::I32));
        let x = fb.param(0);
        let mut entry = fb.entry_block();
        let one = entry.iconst(Type::I32, 1);
        let dead = entry.add(Type::I32, x, one);
        entry.mul(Type::I32, dead, dead);
        entry.ret(Some(x));
        fb.build().unwrap();
        let module = mb.build().unwrap();

        let mut dce = DeadCodeElimination::new();
        let module = dce.run(module, &PassContext::default()).unwrap();

        assert_eq!(dce.removed(), 3);
        assert_eq!(module.get_function("f").unwrap().instruction_count(), 0);
    }
}
