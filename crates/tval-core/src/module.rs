use crate::function::Function;
use crate::global::GlobalVariable;
use crate::stage::Stage;
use crate::types::TypeTable;
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A whole compilation unit: global declarations plus functions, both keyed
/// by their linker-visible name in source order.
///
/// `Module` is intentionally not `Clone`; copies go through
/// [`crate::cloner::clone_module`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub context: UnitContext,
    #[serde(default)]
    pub types: TypeTable,
    #[serde(default)]
    pub options: ModuleOptions,
    #[serde(default)]
    stage: Stage,
    #[serde(default)]
    pub globals: IndexMap<String, GlobalVariable>,
    #[serde(default)]
    pub functions: IndexMap<String, Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            context: UnitContext::new(name.clone()),
            name,
            types: TypeTable::new(),
            options: ModuleOptions::default(),
            stage: Stage::Raw,
            globals: IndexMap::new(),
            functions: IndexMap::new(),
        }
    }

    /// An empty module sharing `source`'s unit context, type table, options
    /// and stage.
    pub fn empty_like(source: &Module) -> Self {
        Self {
            name: source.name.clone(),
            context: source.context.clone(),
            types: source.types.clone(),
            options: source.options.clone(),
            stage: source.stage,
            globals: IndexMap::new(),
            functions: IndexMap::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves the module to `stage`. Re-entering the current stage is a no-op;
    /// moving backward is an invariant violation.
    pub fn set_stage(&mut self, stage: Stage) -> Result<()> {
        if stage < self.stage {
            return Err(IrError::Invariant(format!(
                "module '{}' cannot move back from stage {} to {}",
                self.name, self.stage, stage
            )));
        }
        self.stage = stage;
        Ok(())
    }

    pub fn add_function(&mut self, function: Function) -> Result<()> {
        if self.functions.contains_key(&function.name) {
            return Err(IrError::BuilderError(format!(
                "function '{}' is already defined in module '{}'",
                function.name, self.name
            )));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    /// Inserts without checking for an existing definition and returns the
    /// displaced function, if any.
    pub fn insert_function(&mut self, function: Function) -> Option<Function> {
        self.functions.insert(function.name.clone(), function)
    }

    pub fn add_global(&mut self, global: GlobalVariable) -> Result<()> {
        if self.globals.contains_key(&global.name) {
            return Err(IrError::BuilderError(format!(
                "global '{}' is already defined in module '{}'",
                global.name, self.name
            )));
        }
        self.globals.insert(global.name.clone(), global);
        Ok(())
    }

    pub fn insert_global(&mut self, global: GlobalVariable) -> Option<GlobalVariable> {
        self.globals.insert(global.name.clone(), global)
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.get_mut(name)
    }

    pub fn get_global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.get(name)
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitContext {
    pub module_name: String,
    pub source_file: Option<String>,
}

impl UnitContext {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            source_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizationMode {
    #[default]
    None,
    Speed,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssertConfiguration {
    #[default]
    Debug,
    Release,
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleOptions {
    pub optimization: OptimizationMode,
    pub assert_config: AssertConfiguration,
    pub target_triple: Option<String>,
}
