use super::BlockBuilder;
use crate::block::BlockId;
use crate::function::{Function, FunctionAttributes, Linkage};
use crate::module::Module;
use crate::types::{FunctionType, Type};
use crate::values::{SourceLocation, ValueId};
use crate::{IrError, Result};
use std::collections::HashSet;

pub struct FunctionBuilder<'a> {
    module: &'a mut Module,
    function: Function,
    created_blocks: HashSet<BlockId>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(module: &'a mut Module, name: &str, ty: FunctionType) -> Self {
        let function = Function::new(name, ty);
        let mut created_blocks = HashSet::new();
        if let Some(body) = &function.body {
            created_blocks.insert(body.entry_block);
        }
        Self {
            module,
            function,
            created_blocks,
        }
    }

    pub fn linkage(&mut self, linkage: Linkage) -> &mut Self {
        self.function.linkage = linkage;
        self
    }

    pub fn attributes(&mut self, attributes: FunctionAttributes) -> &mut Self {
        self.function.attributes = attributes;
        self
    }

    pub fn location(&mut self, location: SourceLocation) -> &mut Self {
        self.function.location = Some(location);
        self
    }

    pub fn generic_params(&mut self, params: &[&str], requirements: &[&str]) -> &mut Self {
        self.function.ty.generic_env.params = params.iter().map(|p| p.to_string()).collect();
        self.function.ty.generic_env.requirements =
            requirements.iter().map(|r| r.to_string()).collect();
        self
    }

    /// The entry block's `index`-th parameter.
    pub fn param(&self, index: usize) -> ValueId {
        self.function
            .body
            .as_ref()
            .and_then(|body| body.entry_params().get(index))
            .map_or(ValueId(u32::MAX), |param| param.value)
    }

    pub fn params(&self) -> Vec<ValueId> {
        self.function.body.as_ref().map_or_else(Vec::new, |body| {
            body.entry_params().iter().map(|p| p.value).collect()
        })
    }

    pub fn create_block(&mut self) -> BlockId {
        match self.function.body.as_mut() {
            Some(body) => {
                let id = body.create_block();
                self.created_blocks.insert(id);
                id
            }
            None => BlockId(u32::MAX),
        }
    }

    /// Appends a parameter to `block` and returns the value it binds.
    pub fn block_param(&mut self, block: BlockId, ty: Type) -> Result<ValueId> {
        self.function
            .body
            .as_mut()
            .and_then(|body| body.append_block_param(block, ty))
            .ok_or_else(|| {
                IrError::BuilderError(format!(
                    "Block {} does not exist in function {}",
                    block, self.function.name
                ))
            })
    }

    pub fn entry_block(&mut self) -> BlockBuilder<'_> {
        let body = self
            .function
            .body
            .get_or_insert_with(crate::function::FunctionBody::new);
        let entry = body.entry_block;
        BlockBuilder::new(entry, body)
    }

    pub fn switch_to_block(&mut self, block: BlockId) -> Result<BlockBuilder<'_>> {
        if !self.created_blocks.contains(&block) {
            return Err(IrError::BuilderError(format!(
                "Block {} does not exist in function {}",
                block, self.function.name
            )));
        }
        let body = self.function.body.as_mut().ok_or_else(|| {
            IrError::BuilderError(format!("{} is a declaration", self.function.name))
        })?;
        Ok(BlockBuilder::new(block, body))
    }

    pub fn current_function(&self) -> &Function {
        &self.function
    }

    /// Adds the function to the module. Names must be unique.
    pub fn build(self) -> Result<()> {
        self.module.add_function(self.function)
    }
}
