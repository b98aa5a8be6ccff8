/*! Small optimization passes over program modules.
 *
 * They exist so the validator has a real optimizer to watch: each pass rewrites the module in
 * place and can be interleaved with translation validation by the pass manager.
 */

pub mod constant_folding;
pub mod dce;

pub use constant_folding::ConstantFolding;
pub use dce::DeadCodeElimination;

use crate::types::Type;

/// Canonical literal for `value` at `ty`: sign-extended from the type's width,
/// and 0 or 1 for bools.
pub fn normalize(value: i64, ty: Type) -> i64 {
    match ty {
        Type::Bool => value & 1,
        Type::I64 => value,
        _ => {
            let shift = 64 - u32::from(ty.bits());
            (value << shift) >> shift
        }
    }
}

/// The low `ty.bits()` bits of `value`, zero-extended.
pub fn as_unsigned(value: i64, ty: Type) -> u64 {
    match ty.bits() {
        64 => value as u64,
        bits => (value as u64) & ((1u64 << bits) - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_wraps_to_width() {
        assert_eq!(normalize(255, Type::I8), -1);
        assert_eq!(normalize(128, Type::I8), -128);
        assert_eq!(normalize(65536 + 5, Type::I16), 5);
        assert_eq!(normalize(3, Type::Bool), 1);
        assert_eq!(as_unsigned(-1, Type::I8), 255);
    }
}
