use crate::block::{BasicBlock, BlockId, BlockParam};
use crate::types::{FunctionType, Type};
use crate::values::{SourceLocation, ValueId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub ty: FunctionType,
    pub location: Option<SourceLocation>,
    #[serde(default)]
    pub attributes: FunctionAttributes,
    pub body: Option<FunctionBody>,
}

impl Function {
    /// A function with an entry block whose parameters match `ty`.
    pub fn new(name: impl Into<String>, ty: FunctionType) -> Self {
        let mut body = FunctionBody::new();
        for param_ty in &ty.params {
            body.append_entry_param(*param_ty);
        }

        Self {
            name: name.into(),
            linkage: Linkage::Public,
            ty,
            location: None,
            attributes: FunctionAttributes::default(),
            body: Some(body),
        }
    }

    pub fn declaration(name: impl Into<String>, linkage: Linkage, ty: FunctionType) -> Self {
        Self {
            name: name.into(),
            linkage,
            ty,
            location: None,
            attributes: FunctionAttributes::default(),
            body: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_none()
    }

    pub fn block_count(&self) -> usize {
        self.body.as_ref().map_or(0, |body| body.blocks.len())
    }

    pub fn instruction_count(&self) -> usize {
        self.body.as_ref().map_or(0, |body| {
            body.blocks
                .values()
                .map(|block| block.instructions.len())
                .sum()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    Public,
    PublicNonAbi,
    Hidden,
    Shared,
    Private,
    PublicExternal,
    HiddenExternal,
}

impl Linkage {
    pub fn is_external(&self) -> bool {
        matches!(self, Linkage::PublicExternal | Linkage::HiddenExternal)
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Linkage::Public => "public",
            Linkage::PublicNonAbi => "public_non_abi",
            Linkage::Hidden => "hidden",
            Linkage::Shared => "shared",
            Linkage::Private => "private",
            Linkage::PublicExternal => "public_external",
            Linkage::HiddenExternal => "hidden_external",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InlineStrategy {
    #[default]
    Default,
    NoInline,
    AlwaysInline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectsKind {
    ReadNone,
    ReadOnly,
    ReleaseNone,
    #[default]
    ReadWrite,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubclassScope {
    #[default]
    NotApplicable,
    External,
    Internal,
    Resilient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThunkKind {
    #[default]
    NotThunk,
    Thunk,
    Reabstraction,
    SignatureOptimized,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionAttributes {
    pub bare: bool,
    pub transparent: bool,
    pub serialized: bool,
    pub dynamically_replaceable: bool,
    pub entry_count: Option<u64>,
    pub thunk: ThunkKind,
    pub subclass_scope: SubclassScope,
    pub inline_strategy: InlineStrategy,
    pub effects: EffectsKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionBody {
    pub entry_block: BlockId,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    next_block_id: u32,
    next_value_id: u32,
}

impl FunctionBody {
    pub fn new() -> Self {
        let entry_block = BlockId(0);
        let mut blocks = IndexMap::new();
        blocks.insert(entry_block, BasicBlock::new(entry_block));

        Self {
            entry_block,
            blocks,
            next_block_id: 1,
            next_value_id: 0,
        }
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id));
        id
    }

    pub fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        id
    }

    pub fn append_block_param(&mut self, block: BlockId, ty: Type) -> Option<ValueId> {
        if !self.blocks.contains_key(&block) {
            return None;
        }
        let value = self.fresh_value();
        if let Some(b) = self.blocks.get_mut(&block) {
            b.add_param(BlockParam::new(value, ty));
        }
        Some(value)
    }

    pub fn append_entry_param(&mut self, ty: Type) -> ValueId {
        let value = self.fresh_value();
        let entry = self.entry_block;
        if let Some(block) = self.blocks.get_mut(&entry) {
            block.add_param(BlockParam::new(value, ty));
        }
        value
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn entry_block(&self) -> BlockId {
        self.entry_block
    }

    pub fn entry_params(&self) -> &[BlockParam] {
        self.blocks
            .get(&self.entry_block)
            .map_or(&[], |block| block.params.as_slice())
    }

    /// Types of every value defined in the body, block parameters included.
    pub fn value_types(&self) -> HashMap<ValueId, Type> {
        let mut types = HashMap::new();
        for block in self.blocks.values() {
            for param in &block.params {
                types.insert(param.value, param.ty);
            }
            for inst in &block.instructions {
                types.extend(inst.definitions());
            }
        }
        types
    }

    pub fn value_count(&self) -> u32 {
        self.next_value_id
    }
}

impl Default for FunctionBody {
    fn default() -> Self {
        Self::new()
    }
}
