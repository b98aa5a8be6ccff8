use super::sample_module;
use crate::builder::ModuleBuilder;
use crate::diagnostics::{run_diagnostic_passes, DiagnosticKind};
use crate::format::format_module;
use crate::lowering::{lower_module, prune_unreachable_blocks};
use crate::stage::Stage;
use crate::types::Type;
use crate::IrError;

#[test]
fn test_lowering_reaches_lowered_from_every_stage() {
    let mut raw = sample_module();
    lower_module(&mut raw).unwrap();
    assert_eq!(raw.stage(), Stage::Lowered);

    let mut canonical = sample_module();
    prune_unreachable_blocks(&mut canonical);
    canonical.set_stage(Stage::Canonical).unwrap();
    lower_module(&mut canonical).unwrap();
    assert_eq!(canonical.stage(), Stage::Lowered);

    assert_eq!(format_module(&canonical), format_module(&raw));
}

#[test]
fn test_lowering_twice_is_a_no_op() {
    let mut module = sample_module();
    lower_module(&mut module).unwrap();
    let once = format_module(&module);

    lower_module(&mut module).unwrap();
    assert_eq!(format_module(&module), once);
    assert_eq!(module.stage(), Stage::Lowered);
}

#[test]
fn test_lowered_module_has_no_high_level_constructs() {
    let mut module = sample_module();
    lower_module(&mut module).unwrap();

    for function in module.functions.values() {
        let Some(body) = &function.body else { continue };
        for block in body.blocks.values() {
            assert!(!block.terminator.is_high_level());
            assert!(block.instructions.iter().all(|i| !i.is_high_level()));
        }
    }
}

#[test]
fn test_raw_module_with_diagnostics_is_refused() {
    let mut mb = ModuleBuilder::new("broken");
    let mut fb = mb.function("f", vec![Type::I32], Some(Type::I32));
    fb.entry_block().ret(None);
    fb.build().unwrap();
    let mut module = mb.build().unwrap();

    let err = lower_module(&mut module).unwrap_err();
    assert!(matches!(err, IrError::Diagnostics(ref d) if !d.is_empty()));
    assert_eq!(module.stage(), Stage::Raw);
}

#[test]
fn test_switch_on_bool_is_refused_before_lowering() {
    let mut mb = ModuleBuilder::new("flags");
    let mut fb = mb.function("pick", vec![Type::Bool], Some(Type::I32));
    let flag = fb.param(0);
    let on = fb.create_block();
    let off = fb.create_block();
    fb.entry_block().switch(flag, Type::Bool, vec![(1, on)], off);
    {
        let mut block = fb.switch_to_block(on).unwrap();
        let one = block.iconst(Type::I32, 1);
        block.ret(Some(one));
    }
    {
        let mut block = fb.switch_to_block(off).unwrap();
        let zero = block.iconst(Type::I32, 0);
        block.ret(Some(zero));
    }
    fb.build().unwrap();
    let mut module = mb.build().unwrap();

    let diagnostics = run_diagnostic_passes(&module);
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::TypeMismatch && d.message.contains("switch")));

    let err = lower_module(&mut module).unwrap_err();
    assert!(matches!(err, IrError::Diagnostics(_)));
    assert!(err.is_invariant());
    assert_eq!(module.stage(), Stage::Raw);
}

#[test]
fn test_use_outside_defining_branch_is_refused_before_codegen() {
    let mut mb = ModuleBuilder::new("leaky");
    let mut fb = mb.function("leak", vec![Type::Bool], Some(Type::I32));
    let c = fb.param(0);
    let left = fb.create_block();
    let right = fb.create_block();
    fb.entry_block().branch(c, left, vec![], right, vec![]);
    let seven = {
        let mut block = fb.switch_to_block(left).unwrap();
        let seven = block.iconst(Type::I32, 7);
        block.ret(Some(seven));
        seven
    };
    fb.switch_to_block(right).unwrap().ret(Some(seven));
    fb.build().unwrap();
    let mut module = mb.build().unwrap();

    let err = lower_module(&mut module).unwrap_err();
    match &err {
        IrError::Diagnostics(d) => {
            assert_eq!(d.len(), 1);
            assert_eq!(d[0].kind, DiagnosticKind::UndefinedValue);
        }
        other => panic!("expected diagnostics, got {other}"),
    }
    assert!(err.is_invariant());
}
