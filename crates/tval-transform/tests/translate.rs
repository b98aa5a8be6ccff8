use pretty_assertions::assert_eq;
use tval_core::codegen::{Endianness, TargetDescriptor};
use tval_core::instructions::{CompareOp, OverflowOp};
use tval_core::{lower_and_generate, CodegenOptions, LowLevelModule, Module, ModuleBuilder, Type};
use tval_transform::vir::{Inst, Terminator, Type as VirType};
use tval_transform::{
    translate_function, translate_module, DataLayout, DiagnosticSink, EngineContext,
    TranslateError,
};

fn engine() -> EngineContext {
    EngineContext::new(DataLayout::default(), DiagnosticSink::Silent)
}

/// `counter` bumps a global with checked arithmetic and reports the new value;
/// the second function picks the larger of its arguments.
fn program(max_name: &str) -> Module {
    let mut mb = ModuleBuilder::new("program");
    mb.global_with_value("count", Type::I64, 0)
        .declare("report", vec![Type::I64], None);

    {
        let mut fb = mb.function("counter", vec![Type::I64], Some(Type::I64));
        let step = fb.param(0);
        let mut entry = fb.entry_block();
        let current = entry.load_global("count", Type::I64);
        let next = entry.checked(OverflowOp::Add, true, Type::I64, current, step);
        entry.store_global("count", Type::I64, next);
        entry.apply("report", vec![next], None);
        entry.ret(Some(next));
        fb.build().unwrap();
    }

    {
        let mut fb = mb.function(max_name, vec![Type::I32, Type::I32], Some(Type::I32));
        let (a, b) = (fb.param(0), fb.param(1));
        let done = fb.create_block();
        let picked = fb.block_param(done, Type::I32).unwrap();
        let mut entry = fb.entry_block();
        let less = entry.compare(CompareOp::Slt, Type::I32, a, b);
        entry.branch(less, done, vec![b], done, vec![a]);
        fb.switch_to_block(done).unwrap().ret(Some(picked));
        fb.build().unwrap();
    }

    mb.build().unwrap()
}

fn generate(module: Module) -> LowLevelModule {
    lower_and_generate(module, &CodegenOptions::default()).unwrap()
}

#[test]
fn test_translate_module_skips_declarations() {
    let low = generate(program("max"));
    let vir = translate_module(&low, &engine()).unwrap();

    assert_eq!(vir.name, "program");
    assert_eq!(vir.names(), vec!["counter", "max"]);
}

#[test]
fn test_side_effects_become_explicit() {
    let low = generate(program("max"));
    let vir = translate_module(&low, &engine()).unwrap();
    let counter = vir.get("counter").unwrap();

    assert_eq!(counter.params, vec![VirType::I64]);
    assert_eq!(counter.result, Some(VirType::I64));
    assert_eq!(counter.callees(), vec!["report"]);
    assert_eq!(counter.globals(), vec![("count", VirType::I64)]);

    let insts = &counter.entry().unwrap().insts;
    assert!(insts.iter().any(|i| matches!(i, Inst::Overflow { .. })));
    assert!(insts.iter().any(|i| matches!(i, Inst::TrapIf { .. })));
    assert!(insts.iter().any(|i| matches!(i, Inst::Store { .. })));
    assert!(matches!(
        counter.entry().unwrap().term,
        Terminator::Return(ref values) if values.len() == 1
    ));
}

#[test]
fn test_block_arguments_survive() {
    let low = generate(program("max"));
    let vir = translate_module(&low, &engine()).unwrap();
    let max = vir.get("max").unwrap();

    assert_eq!(max.blocks.len(), 2);
    assert_eq!(max.blocks[1].params.len(), 1);
    match &max.blocks[0].term {
        Terminator::Branch {
            then_args,
            else_args,
            ..
        } => {
            assert_eq!(then_args.len(), 1);
            assert_eq!(else_args.len(), 1);
        }
        other => panic!("expected a branch, got {}", other),
    }
}

#[test]
fn test_translation_is_deterministic() {
    let first = translate_module(&generate(program("max")), &engine()).unwrap();
    let second = translate_module(&generate(program("max")), &engine()).unwrap();

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first, second);
}

#[test]
fn test_renamed_function_prints_the_same_body() {
    let original = translate_module(&generate(program("max")), &engine()).unwrap();
    let renamed = translate_module(&generate(program("larger")), &engine()).unwrap();

    let a = original.get("max").unwrap();
    let b = renamed.get("larger").unwrap();
    assert_ne!(a.to_string(), b.to_string());
    assert_eq!(a.body().to_string(), b.body().to_string());
}

#[test]
fn test_declaration_is_rejected() {
    let low = generate(program("max"));
    let report = low.get_function("report").unwrap();

    let err = translate_function(report, &low.target, &low.symbols, &engine()).unwrap_err();
    assert!(matches!(err, TranslateError::Declaration(name) if name == "report"));
}

#[test]
fn test_incompatible_target_is_rejected() {
    let low = generate(program("max"));
    let narrow = EngineContext::new(
        DataLayout {
            pointer_bits: 32,
            endianness: Endianness::Little,
        },
        DiagnosticSink::Silent,
    );
    assert!(matches!(
        translate_module(&low, &narrow),
        Err(TranslateError::IncompatibleTarget { .. })
    ));

    let big_endian = TargetDescriptor {
        triple: "s390x-unknown-linux-gnu".to_string(),
        pointer_bits: 64,
        endianness: Endianness::Big,
    };
    let counter = low.get_function("counter").unwrap();
    assert!(translate_function(counter, &big_endian, &low.symbols, &engine()).is_err());
}
