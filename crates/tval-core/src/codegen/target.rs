use crate::{IrError, Result};
use cranelift_codegen::ir;
use cranelift_codegen::isa::{self, OwnedTargetIsa};
use cranelift_codegen::settings::{self, Configurable};
use std::fmt;

pub const DEFAULT_TRIPLE: &str = "x86_64-unknown-linux-gnu";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "little"),
            Endianness::Big => write!(f, "big"),
        }
    }
}

/// The parts of a target that affect what generated code means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub triple: String,
    pub pointer_bits: u8,
    pub endianness: Endianness,
}

impl TargetDescriptor {
    pub fn from_isa(isa: &dyn isa::TargetIsa) -> Self {
        let endianness = match isa.endianness() {
            ir::Endianness::Little => Endianness::Little,
            ir::Endianness::Big => Endianness::Big,
        };
        Self {
            triple: isa.triple().to_string(),
            pointer_bits: isa.pointer_bits(),
            endianness,
        }
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (ptr{} {}-endian)",
            self.triple, self.pointer_bits, self.endianness
        )
    }
}

pub fn lookup_isa(triple: &str) -> Result<OwnedTargetIsa> {
    let mut flags_builder = settings::builder();
    flags_builder
        .set("opt_level", "none")
        .map_err(|e| IrError::CraneliftError(format!("Failed to set flags: {}", e)))?;
    let isa_builder = isa::lookup_by_name(triple)
        .map_err(|e| IrError::CraneliftError(format!("Failed to lookup ISA '{}': {}", triple, e)))?;

    let flags = settings::Flags::new(flags_builder);
    isa_builder
        .finish(flags)
        .map_err(|e| IrError::CraneliftError(format!("Failed to create ISA: {}", e)))
}
