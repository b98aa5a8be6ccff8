use cranelift_codegen::ir::{self as clif_ir, AbiParam, UserFuncName};
use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{DataId, FuncId, Module as _};
use cranelift_object::{ObjectBuilder, ObjectModule};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::context::CodegenContext;
use super::lowering::{lower_instruction, lower_terminator};
use super::target::{lookup_isa, TargetDescriptor};
use super::{DataSymbol, LowLevelFunction, LowLevelModule, SymbolTable};
use crate::block::BlockId;
use crate::function::{Function, FunctionBody, Linkage};
use crate::module::Module;
use crate::{IrError, Result};

/// Symbols visible to the function currently being generated.
pub struct SymbolRefs<'a> {
    pub objects: &'a mut ObjectModule,
    pub functions: &'a HashMap<String, FuncId>,
    pub data: &'a HashMap<String, DataId>,
    pub pointer_type: clif_ir::Type,
}

pub struct LowLevelGenerator {
    isa: OwnedTargetIsa,
    objects: ObjectModule,
    builder_context: FunctionBuilderContext,
}

impl LowLevelGenerator {
    pub fn new(name: &str, triple: &str) -> Result<Self> {
        let isa = lookup_isa(triple)?;
        let object_builder =
            ObjectBuilder::new(isa.clone(), name, cranelift_module::default_libcall_names())
                .map_err(|e| {
                    IrError::CraneliftError(format!("Failed to create object builder: {}", e))
                })?;

        Ok(Self {
            isa,
            objects: ObjectModule::new(object_builder),
            builder_context: FunctionBuilderContext::new(),
        })
    }

    pub fn target(&self) -> TargetDescriptor {
        TargetDescriptor::from_isa(self.isa.as_ref())
    }

    pub fn generate(mut self, module: Module, name: String) -> Result<LowLevelModule> {
        let mut symbols = SymbolTable::new();
        let mut data_ids = HashMap::new();
        let mut data = Vec::new();

        for global in module.globals.values() {
            let linkage = module_linkage(global.linkage, false);
            let id = self
                .objects
                .declare_data(&global.name, linkage, true, false)
                .map_err(|e| IrError::CraneliftError(format!("Failed to declare data: {}", e)))?;
            symbols.insert_data(id.as_u32(), &global.name, global.ty);
            data_ids.insert(global.name.clone(), id);
            data.push(DataSymbol {
                name: global.name.clone(),
                ty: global.ty,
                linkage: global.linkage,
            });
        }

        let mut func_ids = HashMap::new();
        for function in module.functions.values() {
            let sig = self.signature(function);
            let linkage = module_linkage(function.linkage, function.is_declaration());
            let id = self
                .objects
                .declare_function(&function.name, linkage, &sig)
                .map_err(|e| {
                    IrError::CraneliftError(format!("Failed to declare function: {}", e))
                })?;
            symbols.insert_function(id.as_u32(), &function.name);
            func_ids.insert(function.name.clone(), id);
        }

        let target = self.target();
        let pointer_type = self.isa.pointer_type();
        let mut functions = Vec::with_capacity(module.functions.len());
        let mut hasher = Sha256::new();

        for function in module.functions.values() {
            let Some(body) = &function.body else {
                functions.push(LowLevelFunction {
                    name: function.name.clone(),
                    linkage: function.linkage,
                    func: None,
                });
                continue;
            };

            let func_id = func_ids.get(&function.name).copied().ok_or_else(|| {
                IrError::Invariant(format!("@{} was not declared", function.name))
            })?;
            let mut refs = SymbolRefs {
                objects: &mut self.objects,
                functions: &func_ids,
                data: &data_ids,
                pointer_type,
            };
            let func = build_function(
                function,
                body,
                func_id,
                &mut refs,
                &mut self.builder_context,
            )?;

            cranelift_codegen::verify_function(&func, self.isa.as_ref()).map_err(|errors| {
                IrError::CraneliftError(format!(
                    "generated code for @{} failed verification: {}",
                    function.name, errors
                ))
            })?;

            hasher.update(function.name.as_bytes());
            hasher.update(func.display().to_string().as_bytes());
            debug!(function = %function.name, blocks = func.layout.blocks().count(), "generated function");

            functions.push(LowLevelFunction {
                name: function.name.clone(),
                linkage: function.linkage,
                func: Some(func),
            });
        }

        Ok(LowLevelModule {
            name,
            target,
            functions,
            data,
            symbols,
            output_hash: hex::encode(hasher.finalize()),
        })
    }

    fn signature(&self, function: &Function) -> clif_ir::Signature {
        let mut sig = self.objects.make_signature();
        for ty in &function.ty.params {
            sig.params.push(AbiParam::new(ty.to_cranelift()));
        }
        if let Some(ty) = function.ty.result {
            sig.returns.push(AbiParam::new(ty.to_cranelift()));
        }
        sig
    }
}

fn build_function(
    function: &Function,
    body: &FunctionBody,
    func_id: FuncId,
    symbols: &mut SymbolRefs<'_>,
    builder_context: &mut FunctionBuilderContext,
) -> Result<clif_ir::Function> {
    let sig = symbols
        .objects
        .declarations()
        .get_function_decl(func_id)
        .signature
        .clone();
    let mut func = clif_ir::Function::with_name_signature(
        UserFuncName::user(super::FUNCTION_NAMESPACE, func_id.as_u32()),
        sig,
    );

    let mut ctx = CodegenContext::new(&function.name);
    let order = reverse_postorder(body);
    {
        let mut builder = FunctionBuilder::new(&mut func, builder_context);

        for id in &order {
            let clif_block = builder.create_block();
            ctx.bind_block(*id, clif_block);
        }

        for id in &order {
            let block = body.get_block(*id).ok_or_else(|| {
                IrError::Invariant(format!("@{} lost block {}", function.name, id))
            })?;
            let clif_block = ctx.block(*id)?;

            if *id == body.entry_block {
                builder.append_block_params_for_function_params(clif_block);
            } else {
                for param in &block.params {
                    builder.append_block_param(clif_block, param.ty.to_cranelift());
                }
            }
            let clif_params = builder.block_params(clif_block).to_vec();
            for (param, value) in block.params.iter().zip(clif_params) {
                ctx.define(param.value, value);
            }

            builder.switch_to_block(clif_block);
            for inst in &block.instructions {
                lower_instruction(inst, &mut ctx, &mut builder, symbols)?;
            }
            lower_terminator(&block.terminator, &ctx, &mut builder)?;
        }

        builder.seal_all_blocks();
        builder.finalize();
    }

    Ok(func)
}

/// Blocks reachable from the entry, each after its dominators.
fn reverse_postorder(body: &FunctionBody) -> Vec<BlockId> {
    let mut visited = HashSet::new();
    let mut postorder = Vec::new();
    let mut stack = vec![(body.entry_block, false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            postorder.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        if let Some(block) = body.get_block(id) {
            for succ in block.successors().into_iter().rev() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
    }

    postorder.reverse();
    postorder
}

fn module_linkage(linkage: Linkage, declaration: bool) -> cranelift_module::Linkage {
    if declaration || linkage.is_external() {
        return cranelift_module::Linkage::Import;
    }
    match linkage {
        Linkage::Public | Linkage::PublicNonAbi => cranelift_module::Linkage::Export,
        Linkage::Hidden => cranelift_module::Linkage::Hidden,
        Linkage::Shared => cranelift_module::Linkage::Preemptible,
        Linkage::Private => cranelift_module::Linkage::Local,
        Linkage::PublicExternal | Linkage::HiddenExternal => cranelift_module::Linkage::Import,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkage_mapping() {
        assert_eq!(
            module_linkage(Linkage::Public, false),
            cranelift_module::Linkage::Export
        );
        assert_eq!(
            module_linkage(Linkage::Private, false),
            cranelift_module::Linkage::Local
        );
        assert_eq!(
            module_linkage(Linkage::Public, true),
            cranelift_module::Linkage::Import
        );
    }
}
