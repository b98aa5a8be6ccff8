use cranelift_codegen::ir::types as clif_types;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    I8,
    I16,
    I32,
    I64,
}

impl Type {
    pub fn bits(&self) -> u8 {
        match self {
            Type::Bool => 1,
            Type::I8 => 8,
            Type::I16 => 16,
            Type::I32 => 32,
            Type::I64 => 64,
        }
    }

    /// Bools are carried as bytes once lowered, matching what `icmp` produces.
    pub fn to_cranelift(&self) -> clif_types::Type {
        match self {
            Type::Bool | Type::I8 => clif_types::I8,
            Type::I16 => clif_types::I16,
            Type::I32 => clif_types::I32,
            Type::I64 => clif_types::I64,
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, Type::Bool)
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Type::Bool),
            8 => Some(Type::I8),
            16 => Some(Type::I16),
            32 => Some(Type::I32),
            64 => Some(Type::I64),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallingConvention {
    #[default]
    Thin,
    Method,
    C,
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallingConvention::Thin => write!(f, "thin"),
            CallingConvention::Method => write!(f, "method"),
            CallingConvention::C => write!(f, "c"),
        }
    }
}

/// Generic parameters and their requirements, kept opaque. Lowering only
/// handles concrete signatures, but the environment is carried through
/// clones unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GenericEnvironment {
    pub params: Vec<String>,
    pub requirements: Vec<String>,
}

impl GenericEnvironment {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.requirements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub result: Option<Type>,
    #[serde(default)]
    pub generic_env: GenericEnvironment,
    #[serde(default)]
    pub convention: CallingConvention,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, result: Option<Type>) -> Self {
        Self {
            params,
            result,
            generic_env: GenericEnvironment::default(),
            convention: CallingConvention::default(),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@convention({}) ", self.convention)?;
        if !self.generic_env.params.is_empty() {
            write!(f, "<{}", self.generic_env.params.join(", "))?;
            if !self.generic_env.requirements.is_empty() {
                write!(f, " where {}", self.generic_env.requirements.join(", "))?;
            }
            write!(f, "> ")?;
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")?;
        match self.result {
            Some(ty) => write!(f, " -> {}", ty),
            None => write!(f, " -> ()"),
        }
    }
}

/// Named type aliases shared by every function of a module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeTable {
    aliases: IndexMap<String, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, ty: Type) {
        self.aliases.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<Type> {
        self.aliases.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.aliases.iter()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
