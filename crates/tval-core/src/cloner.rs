use crate::block::BlockId;
use crate::function::{Function, FunctionBody};
use crate::global::GlobalVariable;
use crate::module::Module;
use crate::values::ValueId;
use crate::{IrError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Produces an independent copy of `source`.
///
/// Globals and functions keep their order, names, linkage, types and
/// attributes. Bodies are rebuilt through fresh value and block maps, so the
/// copy shares nothing with the source and can be lowered without touching it.
/// Static initializers of globals are not carried over.
pub fn clone_module(source: &Module) -> Result<Module> {
    let mut dest = Module::empty_like(source);

    for global in source.globals.values() {
        if global.has_initializer() {
            debug!(
                module = %source.name,
                global = %global.name,
                "static initializer not cloned"
            );
        }
        dest.insert_global(GlobalVariable {
            name: global.name.clone(),
            linkage: global.linkage,
            serialized: global.serialized,
            ty: global.ty,
            location: global.location.clone(),
            decl: global.decl.clone(),
            initializer: None,
        });
    }

    for function in source.functions.values() {
        let mut decl = Function::declaration(function.name.clone(), function.linkage, function.ty.clone());
        decl.location = function.location.clone();
        decl.attributes = function.attributes.clone();
        dest.insert_function(decl);
    }

    if dest.globals.len() != source.globals.len() {
        return Err(IrError::Invariant(format!(
            "cloned module '{}' has {} globals, source has {}",
            source.name,
            dest.globals.len(),
            source.globals.len()
        )));
    }
    if dest.functions.len() != source.functions.len() {
        return Err(IrError::Invariant(format!(
            "cloned module '{}' has {} functions, source has {}",
            source.name,
            dest.functions.len(),
            source.functions.len()
        )));
    }

    for (src, dst) in source.functions.values().zip(dest.functions.values_mut()) {
        if let Some(body) = &src.body {
            dst.body = Some(FunctionCloner::new().clone_body(body));
        }
    }

    debug!(
        module = %source.name,
        functions = dest.functions.len(),
        globals = dest.globals.len(),
        "cloned module"
    );
    Ok(dest)
}

/// Copies one function body, renumbering values and blocks densely in
/// layout order.
#[derive(Default)]
pub struct FunctionCloner {
    values: HashMap<ValueId, ValueId>,
    blocks: HashMap<BlockId, BlockId>,
}

impl FunctionCloner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clone_body(&mut self, source: &FunctionBody) -> FunctionBody {
        let mut dest = FunctionBody::new();

        for id in source.blocks.keys() {
            let new_id = if *id == source.entry_block {
                dest.entry_block
            } else {
                dest.create_block()
            };
            self.blocks.insert(*id, new_id);
        }

        for block in source.blocks.values() {
            let new_block = self.map_block(block.id);

            for param in &block.params {
                let value = self.map_value(&mut dest, param.value);
                if let Some(target) = dest.get_block_mut(new_block) {
                    target.add_param(crate::block::BlockParam::new(value, param.ty));
                }
            }

            let mut instructions = Vec::with_capacity(block.instructions.len());
            for inst in &block.instructions {
                instructions.push(inst.map_values(&mut |v| self.map_value(&mut dest, v)));
            }

            let blocks = &self.blocks;
            let values = &mut self.values;
            let terminator = block.terminator.map(
                &mut |v| *values.entry(v).or_insert_with(|| dest.fresh_value()),
                &mut |b| blocks.get(&b).copied().unwrap_or(b),
            );

            if let Some(target) = dest.get_block_mut(new_block) {
                target.instructions = instructions;
                target.terminator = terminator;
            }
        }

        dest
    }

    fn map_block(&self, block: BlockId) -> BlockId {
        self.blocks.get(&block).copied().unwrap_or(block)
    }

    fn map_value(&mut self, dest: &mut FunctionBody, value: ValueId) -> ValueId {
        *self
            .values
            .entry(value)
            .or_insert_with(|| dest.fresh_value())
    }
}
