use tval_core::codegen::{lower_and_generate, CodegenOptions};
use tval_core::ir_persist::{load_module, save_module};
use tval_core::opt::{ConstantFolding, DeadCodeElimination};
use tval_core::{clone_module, BinaryOp, ModuleBuilder, PassManager, Stage, Type};

fn arithmetic_module() -> tval_core::Module {
    let mut mb = ModuleBuilder::new("arith");
    let mut fb = mb.function("scale", vec![Type::I32], Some(Type::I32));
    let x = fb.param(0);
    let mut entry = fb.entry_block();
    let two = entry.iconst(Type::I32, 2);
    let three = entry.iconst(Type::I32, 3);
    let six = entry.mul(Type::I32, two, three);
    let shifted = entry.binary(BinaryOp::Shl, Type::I32, x, two);
    let _unused = entry.sub(Type::I32, shifted, six);
    let result = entry.add(Type::I32, x, six);
    entry.ret(Some(result));
    fb.build().unwrap();
    mb.build().unwrap()
}

#[test]
fn test_json_round_trip_then_codegen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arith.json");
    save_module(&arithmetic_module(), &path).unwrap();

    let loaded = load_module(&path).unwrap();
    assert_eq!(loaded.stage(), Stage::Raw);

    let low = lower_and_generate(loaded, &CodegenOptions::default()).unwrap();
    assert_eq!(low.functions.len(), 1);
    assert!(low.display().contains("function"));
}

#[test]
fn test_pass_manager_runs_passes_in_order() {
    let mut pm = PassManager::new();
    pm.enable_statistics();
    pm.register_pass(ConstantFolding::new());
    pm.register_pass(DeadCodeElimination::new());
    assert_eq!(pm.pass_names(), vec!["const-fold", "dce"]);

    let module = pm.run_all(arithmetic_module()).unwrap();
    let stats = pm.statistics();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].instructions_before, 6);
    // The multiply folds to a literal; dce then drops the unused subtract,
    // the shift feeding it, and the two literals nobody reads anymore.
    assert_eq!(stats[1].instructions_after, 2);
    assert_eq!(module.get_function("scale").unwrap().instruction_count(), 2);
}

#[test]
fn test_optimized_clone_still_generates() {
    let source = arithmetic_module();
    let mut pm = PassManager::new();
    pm.register_pass(ConstantFolding::new());
    pm.register_pass(DeadCodeElimination::new());
    let optimized = pm.run_all(clone_module(&source).unwrap()).unwrap();

    let before = lower_and_generate(source, &CodegenOptions::default()).unwrap();
    let after = lower_and_generate(optimized, &CodegenOptions::default()).unwrap();
    assert_ne!(before.output_hash, after.output_hash);
}
