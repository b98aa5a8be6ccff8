/*! Test coverage for the program module IR and its stages.
 *
 * The cloner and the stage machine are what keep the validator honest: a clone that shares state
 * with its source, or a stage that can run twice, would let an optimizer bug slip through. These
 * tests pin both down alongside the builder and the Cranelift bridge.
 */

mod builder_api_tests;
mod cloner_tests;
mod codegen_tests;
mod stage_tests;

use crate::builder::ModuleBuilder;
use crate::function::{FunctionAttributes, InlineStrategy, Linkage};
use crate::instructions::{CompareOp, OverflowOp};
use crate::module::Module;
use crate::types::Type;
use crate::values::SourceLocation;

/// A module touching every construct the cloner and lowering care about:
/// a global with an initializer, an external declaration, branches with
/// block arguments, checked arithmetic, a switch and a call.
pub(crate) fn sample_module() -> Module {
    let mut mb = ModuleBuilder::new("sample");
    mb.source_file("sample.src")
        .type_alias("Count", Type::I64)
        .global_with_value("total", Type::I64, 42)
        .declare("log_value", vec![Type::I64], None);

    {
        let mut fb = mb.function("clamp", vec![Type::I64, Type::I64], Some(Type::I64));
        fb.linkage(Linkage::Hidden)
            .location(SourceLocation::new("sample.src", 3, 1))
            .attributes(FunctionAttributes {
                inline_strategy: InlineStrategy::AlwaysInline,
                entry_count: Some(12),
                ..FunctionAttributes::default()
            });
        let (x, limit) = (fb.param(0), fb.param(1));
        let join = fb.create_block();
        let picked = fb.block_param(join, Type::I64).unwrap();

        let mut entry = fb.entry_block();
        let over = entry.compare(CompareOp::Sgt, Type::I64, x, limit);
        entry.branch(over, join, vec![limit], join, vec![x]);

        let mut tail = fb.switch_to_block(join).unwrap();
        tail.debug_value(picked, "picked");
        tail.ret(Some(picked));
        fb.build().unwrap();
    }

    {
        let mut fb = mb.function("accumulate", vec![Type::I64], Some(Type::I64));
        let x = fb.param(0);
        let mut entry = fb.entry_block();
        let current = entry.load_global("total", Type::I64);
        let sum = entry.checked(OverflowOp::Add, true, Type::I64, current, x);
        entry.store_global("total", Type::I64, sum);
        entry.apply("log_value", vec![sum], None);
        entry.ret(Some(sum));
        fb.build().unwrap();
    }

    {
        let mut fb = mb.function("classify", vec![Type::I32], Some(Type::I32));
        let x = fb.param(0);
        let small = fb.create_block();
        let large = fb.create_block();
        let other = fb.create_block();
        fb.entry_block()
            .switch(x, Type::I32, vec![(0, small), (100, large)], other);
        for (block, value) in [(small, 1), (large, 2), (other, 3)] {
            let mut bb = fb.switch_to_block(block).unwrap();
            let v = bb.iconst(Type::I32, value);
            bb.ret(Some(v));
        }
        fb.build().unwrap();
    }

    mb.build().unwrap()
}
