/*! Generate Cranelift IR for a lowered program module.
 *
 * Translation validation compares low-level code, so both snapshots of a module are pushed through
 * the same backend. Functions are built in memory with `cranelift_frontend`, checked by the
 * Cranelift verifier, and handed back together with the symbol table needed to resolve calls and
 * global accesses. No machine code or object file is produced.
 */

pub mod context;
pub mod lowering;
pub mod module;
pub mod target;

pub use context::CodegenContext;
pub use lowering::{lower_instruction, lower_terminator};
pub use module::LowLevelGenerator;
pub use target::{Endianness, TargetDescriptor, DEFAULT_TRIPLE};

use crate::function::Linkage;
use crate::lowering::lower_module;
use crate::module::Module;
use crate::stage::Stage;
use crate::types::Type;
use crate::{IrError, Result};
use cranelift_codegen::ir::{self as clif_ir, UserExternalName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Namespace used by `cranelift_module` for function references.
pub const FUNCTION_NAMESPACE: u32 = 0;
/// Namespace used by `cranelift_module` for data references.
pub const DATA_NAMESPACE: u32 = 1;

/// Where generated artifacts would go. Generation is in memory only, so these
/// are carried for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub main_output: Option<PathBuf>,
    pub ir_dump: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Name of the generated module. Empty means the program module's name.
    pub module_name: String,
    pub target_triple: Option<String>,
    pub outputs: OutputPaths,
    pub parallel_outputs: bool,
}

pub struct LowLevelFunction {
    pub name: String,
    pub linkage: Linkage,
    /// `None` for functions only declared in the module.
    pub func: Option<clif_ir::Function>,
}

impl LowLevelFunction {
    pub fn is_declaration(&self) -> bool {
        self.func.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSymbol {
    pub name: String,
    pub ty: Type,
    pub linkage: Linkage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Data,
}

/// Maps the user external names that appear in generated functions back to
/// module symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    functions: HashMap<u32, String>,
    data: HashMap<u32, (String, Type)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_function(&mut self, index: u32, name: impl Into<String>) {
        self.functions.insert(index, name.into());
    }

    pub fn insert_data(&mut self, index: u32, name: impl Into<String>, ty: Type) {
        self.data.insert(index, (name.into(), ty));
    }

    pub fn resolve(&self, name: &UserExternalName) -> Option<(SymbolKind, &str)> {
        match name.namespace {
            FUNCTION_NAMESPACE => self
                .functions
                .get(&name.index)
                .map(|n| (SymbolKind::Function, n.as_str())),
            DATA_NAMESPACE => self
                .data
                .get(&name.index)
                .map(|(n, _)| (SymbolKind::Data, n.as_str())),
            _ => None,
        }
    }

    pub fn data_type(&self, index: u32) -> Option<Type> {
        self.data.get(&index).map(|(_, ty)| *ty)
    }
}

pub struct LowLevelModule {
    pub name: String,
    pub target: TargetDescriptor,
    pub functions: Vec<LowLevelFunction>,
    pub data: Vec<DataSymbol>,
    pub symbols: SymbolTable,
    /// SHA-256 over the printed functions, hex encoded.
    pub output_hash: String,
}

impl LowLevelModule {
    pub fn get_function(&self, name: &str) -> Option<&LowLevelFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// The Cranelift text of every defined function, in module order.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for function in &self.functions {
            match &function.func {
                Some(func) => {
                    out.push_str(&format!("; {}\n{}\n", function.name, func.display()));
                }
                None => out.push_str(&format!("; {} (declaration)\n\n", function.name)),
            }
        }
        out
    }
}

/// Generates Cranelift IR for every function of `module`, which must already
/// be `Lowered`.
pub fn generate_low_level(module: Module, options: &CodegenOptions) -> Result<LowLevelModule> {
    if module.stage() != Stage::Lowered {
        return Err(IrError::Invariant(format!(
            "code generation needs a lowered module, '{}' is {}",
            module.name,
            module.stage()
        )));
    }
    if options.parallel_outputs {
        return Err(IrError::CodegenError(
            "parallel outputs are not supported; generation is single-module".to_string(),
        ));
    }

    let triple = options
        .target_triple
        .clone()
        .or_else(|| module.options.target_triple.clone())
        .unwrap_or_else(|| DEFAULT_TRIPLE.to_string());
    let name = if options.module_name.is_empty() {
        module.name.clone()
    } else {
        options.module_name.clone()
    };

    LowLevelGenerator::new(&name, &triple)?.generate(module, name)
}

/// Lowers `module` through every stage and generates its low-level form.
pub fn lower_and_generate(mut module: Module, options: &CodegenOptions) -> Result<LowLevelModule> {
    lower_module(&mut module)?;
    generate_low_level(module, options)
}
