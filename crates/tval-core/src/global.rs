use crate::function::Linkage;
use crate::instructions::Instruction;
use crate::types::Type;
use crate::values::{SourceLocation, ValueId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    pub linkage: Linkage,
    pub serialized: bool,
    pub ty: Type,
    pub location: Option<SourceLocation>,
    /// Name of the declaration this global was emitted for, if any.
    pub decl: Option<String>,
    pub initializer: Option<StaticInitializer>,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, linkage: Linkage, ty: Type) -> Self {
        Self {
            name: name.into(),
            linkage,
            serialized: false,
            ty,
            location: None,
            decl: None,
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, initializer: StaticInitializer) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }
}

/// A straight-line instruction sequence computing a global's initial value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticInitializer {
    pub instructions: Vec<Instruction>,
    pub result: ValueId,
}

impl StaticInitializer {
    pub fn literal(ty: Type, value: i64) -> Self {
        let result = ValueId(0);
        Self {
            instructions: vec![Instruction::IntegerLiteral { result, ty, value }],
            result,
        }
    }
}
