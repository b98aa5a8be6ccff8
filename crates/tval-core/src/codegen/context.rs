use cranelift_codegen::ir::{self as clif_ir};
use std::collections::HashMap;

use crate::block::BlockId;
use crate::values::ValueId;
use crate::{IrError, Result};

/// Per-function mapping from program values and blocks to their Cranelift
/// counterparts.
#[derive(Default)]
pub struct CodegenContext {
    function: String,
    values: HashMap<ValueId, clif_ir::Value>,
    blocks: HashMap<BlockId, clif_ir::Block>,
}

impl CodegenContext {
    pub fn new(function: &str) -> Self {
        Self {
            function: function.to_string(),
            ..Self::default()
        }
    }

    pub fn define(&mut self, value: ValueId, clif: clif_ir::Value) {
        self.values.insert(value, clif);
    }

    pub fn value(&self, value: ValueId) -> Result<clif_ir::Value> {
        self.values.get(&value).copied().ok_or_else(|| {
            IrError::CodegenError(format!(
                "{} used in @{} before it was generated",
                value, self.function
            ))
        })
    }

    pub fn values(&self, values: &[ValueId]) -> Result<Vec<clif_ir::Value>> {
        values.iter().map(|v| self.value(*v)).collect()
    }

    pub fn bind_block(&mut self, block: BlockId, clif: clif_ir::Block) {
        self.blocks.insert(block, clif);
    }

    pub fn block(&self, block: BlockId) -> Result<clif_ir::Block> {
        self.blocks.get(&block).copied().ok_or_else(|| {
            IrError::CodegenError(format!("{} of @{} has no generated block", block, self.function))
        })
    }
}
