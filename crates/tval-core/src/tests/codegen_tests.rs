use super::sample_module;
use crate::cloner::clone_module;
use crate::codegen::{
    generate_low_level, lower_and_generate, CodegenOptions, Endianness, SymbolKind,
    DEFAULT_TRIPLE,
};
use crate::types::Type;
use crate::IrError;
use cranelift_codegen::ir::{ExternalName, GlobalValueData, InstructionData};

#[test]
fn test_generate_requires_lowered_stage() {
    let err = generate_low_level(sample_module(), &CodegenOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, IrError::Invariant(_)));
}

#[test]
fn test_lower_and_generate_sample_module() {
    let low = lower_and_generate(sample_module(), &CodegenOptions::default()).unwrap();

    assert_eq!(low.name, "sample");
    assert_eq!(low.target.triple, DEFAULT_TRIPLE);
    assert_eq!(low.target.pointer_bits, 64);
    assert_eq!(low.target.endianness, Endianness::Little);
    assert_eq!(low.functions.len(), 4);
    assert!(low.get_function("log_value").unwrap().is_declaration());
    assert!(!low.get_function("clamp").unwrap().is_declaration());
    assert_eq!(low.data.len(), 1);
    assert_eq!(low.output_hash.len(), 64);
}

#[test]
fn test_module_name_override() {
    let options = CodegenOptions {
        module_name: "renamed".to_string(),
        ..CodegenOptions::default()
    };
    let low = lower_and_generate(sample_module(), &options).unwrap();
    assert_eq!(low.name, "renamed");
}

#[test]
fn test_parallel_outputs_are_refused() {
    let options = CodegenOptions {
        parallel_outputs: true,
        ..CodegenOptions::default()
    };
    assert!(matches!(
        lower_and_generate(sample_module(), &options),
        Err(IrError::CodegenError(_))
    ));
}

#[test]
fn test_call_resolves_through_symbol_table() {
    let low = lower_and_generate(sample_module(), &CodegenOptions::default()).unwrap();
    let func = low
        .get_function("accumulate")
        .and_then(|f| f.func.as_ref())
        .unwrap();

    let mut callees = Vec::new();
    for block in func.layout.blocks() {
        for inst in func.layout.block_insts(block) {
            if let InstructionData::Call { func_ref, .. } = &func.dfg.insts[inst] {
                if let ExternalName::User(name_ref) = &func.dfg.ext_funcs[*func_ref].name {
                    let name = &func.params.user_named_funcs()[*name_ref];
                    callees.push(low.symbols.resolve(name).unwrap());
                }
            }
        }
    }
    assert_eq!(callees, vec![(SymbolKind::Function, "log_value")]);
}

#[test]
fn test_global_resolves_to_its_data_type() {
    let low = lower_and_generate(sample_module(), &CodegenOptions::default()).unwrap();
    let func = low
        .get_function("accumulate")
        .and_then(|f| f.func.as_ref())
        .unwrap();

    let mut globals = Vec::new();
    for (_, data) in func.global_values.iter() {
        if let GlobalValueData::Symbol {
            name: ExternalName::User(name_ref),
            ..
        } = data
        {
            let name = &func.params.user_named_funcs()[*name_ref];
            let (kind, symbol) = low.symbols.resolve(name).unwrap();
            globals.push((kind, symbol.to_string(), low.symbols.data_type(name.index)));
        }
    }
    globals.dedup();
    assert_eq!(
        globals,
        vec![(SymbolKind::Data, "total".to_string(), Some(Type::I64))]
    );
    assert_eq!(low.symbols.data_type(u32::MAX), None);
}

#[test]
fn test_generation_is_deterministic_across_clones() {
    let source = sample_module();
    let a = lower_and_generate(clone_module(&source).unwrap(), &CodegenOptions::default()).unwrap();
    let b = lower_and_generate(clone_module(&source).unwrap(), &CodegenOptions::default()).unwrap();
    assert_eq!(a.output_hash, b.output_hash);
    assert_eq!(a.display(), b.display());
}

#[test]
fn test_unknown_triple_is_a_cranelift_error() {
    let options = CodegenOptions {
        target_triple: Some("nonsense-unknown-none".to_string()),
        ..CodegenOptions::default()
    };
    assert!(matches!(
        lower_and_generate(sample_module(), &options),
        Err(IrError::CraneliftError(_))
    ));
}
