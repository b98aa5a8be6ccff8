use super::sample_module;
use crate::builder::ModuleBuilder;
use crate::diagnostics::run_diagnostic_passes;
use crate::stage::Stage;
use crate::types::Type;
use crate::IrError;

#[test]
fn test_sample_module_is_well_formed() {
    let module = sample_module();
    assert_eq!(module.stage(), Stage::Raw);
    assert_eq!(
        module.function_names(),
        vec!["log_value", "clamp", "accumulate", "classify"]
    );
    assert!(module.get_function("log_value").unwrap().is_declaration());
    assert!(run_diagnostic_passes(&module).is_empty());
}

#[test]
fn test_duplicate_function_is_rejected() {
    let mut mb = ModuleBuilder::new("dup");
    for _ in 0..2 {
        let mut fb = mb.function("f", vec![], None);
        fb.entry_block().ret(None);
        let _ = fb.build();
    }
    let mut fb = mb.function("f", vec![], None);
    fb.entry_block().ret(None);
    assert!(matches!(fb.build(), Err(IrError::BuilderError(_))));
}

#[test]
fn test_duplicate_global_fails_build() {
    let mut mb = ModuleBuilder::new("dup");
    mb.global("g", Type::I32).global("g", Type::I64);
    assert!(matches!(mb.build(), Err(IrError::BuilderError(_))));
}

#[test]
fn test_switch_to_unknown_block_fails() {
    let mut mb = ModuleBuilder::new("m");
    let mut fb = mb.function("f", vec![], None);
    assert!(fb.switch_to_block(crate::block::BlockId(9)).is_err());
}

#[test]
fn test_set_stage_refuses_to_move_backward() {
    let mut module = sample_module();
    module.set_stage(Stage::Lowered).unwrap();
    let err = module.set_stage(Stage::Raw).unwrap_err();
    assert!(matches!(err, IrError::Invariant(_)));
    assert_eq!(module.stage(), Stage::Lowered);
}
