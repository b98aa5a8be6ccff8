use super::FunctionBuilder;
use crate::function::{Function, Linkage};
use crate::global::{GlobalVariable, StaticInitializer};
use crate::module::Module;
use crate::stage::Stage;
use crate::types::{FunctionType, Type};
use crate::{IrError, Result};

pub struct ModuleBuilder {
    module: Module,
    errors: Vec<String>,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            module: Module::new(name),
            errors: Vec::new(),
        }
    }

    pub fn source_file(&mut self, path: &str) -> &mut Self {
        self.module.context.source_file = Some(path.to_string());
        self
    }

    pub fn type_alias(&mut self, name: &str, ty: Type) -> &mut Self {
        self.module.types.define(name, ty);
        self
    }

    pub fn global(&mut self, name: &str, ty: Type) -> &mut Self {
        self.push_global(GlobalVariable::new(name, Linkage::Hidden, ty))
    }

    pub fn global_with_value(&mut self, name: &str, ty: Type, value: i64) -> &mut Self {
        let global = GlobalVariable::new(name, Linkage::Hidden, ty)
            .with_initializer(StaticInitializer::literal(ty, value));
        self.push_global(global)
    }

    pub fn push_global(&mut self, global: GlobalVariable) -> &mut Self {
        if let Err(err) = self.module.add_global(global) {
            self.errors.push(err.to_string());
        }
        self
    }

    /// Declares an external function with no body.
    pub fn declare(&mut self, name: &str, params: Vec<Type>, result: Option<Type>) -> &mut Self {
        let decl = Function::declaration(
            name,
            Linkage::PublicExternal,
            FunctionType::new(params, result),
        );
        if let Err(err) = self.module.add_function(decl) {
            self.errors.push(err.to_string());
        }
        self
    }

    pub fn function(
        &mut self,
        name: &str,
        params: Vec<Type>,
        result: Option<Type>,
    ) -> FunctionBuilder<'_> {
        FunctionBuilder::new(&mut self.module, name, FunctionType::new(params, result))
    }

    pub fn stage(&mut self, stage: Stage) -> &mut Self {
        if let Err(err) = self.module.set_stage(stage) {
            self.errors.push(err.to_string());
        }
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn build(self) -> Result<Module> {
        if !self.errors.is_empty() {
            return Err(IrError::BuilderError(self.errors.join("; ")));
        }
        Ok(self.module)
    }
}
