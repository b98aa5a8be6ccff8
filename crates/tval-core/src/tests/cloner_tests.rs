use super::sample_module;
use crate::cloner::clone_module;
use crate::format::{format_function, format_module};
use crate::lowering::lower_module;
use crate::stage::Stage;
use pretty_assertions::assert_eq;

#[test]
fn test_clone_preserves_names_order_and_attributes() {
    let source = sample_module();
    let clone = clone_module(&source).unwrap();

    assert_eq!(clone.name, source.name);
    assert_eq!(clone.context, source.context);
    assert_eq!(clone.types, source.types);
    assert_eq!(clone.options, source.options);
    assert_eq!(clone.stage(), source.stage());
    assert_eq!(clone.function_names(), source.function_names());

    for (src, dst) in source.functions.values().zip(clone.functions.values()) {
        assert_eq!(dst.linkage, src.linkage);
        assert_eq!(dst.ty, src.ty);
        assert_eq!(dst.location, src.location);
        assert_eq!(dst.attributes, src.attributes);
        assert_eq!(dst.is_declaration(), src.is_declaration());
        assert_eq!(dst.block_count(), src.block_count());
        assert_eq!(dst.instruction_count(), src.instruction_count());
    }
}

#[test]
fn test_clone_of_layout_numbered_body_prints_identically() {
    let source = sample_module();
    let clone = clone_module(&source).unwrap();

    for name in ["accumulate", "classify"] {
        assert_eq!(
            format_function(clone.get_function(name).unwrap()),
            format_function(source.get_function(name).unwrap())
        );
    }
}

#[test]
fn test_global_initializers_are_not_cloned() {
    let source = sample_module();
    let clone = clone_module(&source).unwrap();

    let src = source.get_global("total").unwrap();
    let dst = clone.get_global("total").unwrap();
    assert!(src.has_initializer());
    assert!(!dst.has_initializer());
    assert_eq!(dst.ty, src.ty);
    assert_eq!(dst.linkage, src.linkage);
}

#[test]
fn test_lowering_the_clone_leaves_source_untouched() {
    let source = sample_module();
    let printed = format_module(&source);

    let mut clone = clone_module(&source).unwrap();
    lower_module(&mut clone).unwrap();

    assert_eq!(clone.stage(), Stage::Lowered);
    assert_eq!(source.stage(), Stage::Raw);
    assert_eq!(format_module(&source), printed);
}

#[test]
fn test_clone_of_clone_matches() {
    let source = sample_module();
    let once = clone_module(&source).unwrap();
    let twice = clone_module(&once).unwrap();
    assert_eq!(format_module(&twice), format_module(&once));
}
