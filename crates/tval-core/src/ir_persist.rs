use crate::module::Module;
use crate::{IrError, Result};
use std::fs;
use std::path::Path;

pub fn save_module(module: &Module, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(module)
        .map_err(|e| IrError::PersistError(format!("cannot serialize '{}': {}", module.name, e)))?;

    fs::write(path, json)
        .map_err(|e| IrError::PersistError(format!("cannot write {}: {}", path.display(), e)))
}

pub fn load_module(path: impl AsRef<Path>) -> Result<Module> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .map_err(|e| IrError::PersistError(format!("cannot read {}: {}", path.display(), e)))?;
    module_from_json(&json)
        .map_err(|e| IrError::PersistError(format!("{}: {}", path.display(), e)))
}

pub fn module_from_json(json: &str) -> std::result::Result<Module, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn module_to_json(module: &Module) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::types::Type;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_preserve_printed_form() {
        let mut mb = ModuleBuilder::new("persisted");
        mb.global_with_value("counter", Type::I64, 7);
        let mut fb = mb.function("twice", vec![Type::I64], Some(Type::I64));
        let x = fb.param(0);
        let mut entry = fb.entry_block();
        let doubled = entry.add(Type::I64, x, x);
        entry.ret(Some(doubled));
        fb.build().unwrap();
        let module = mb.build().unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("module.json");
        save_module(&module, &path).unwrap();
        let loaded = load_module(&path).unwrap();

        assert_eq!(
            crate::format::format_module(&module),
            crate::format::format_module(&loaded)
        );
    }

    #[test]
    fn test_load_missing_file_is_persist_error() {
        let dir = tempdir().unwrap();
        let err = load_module(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, IrError::PersistError(_)));
    }
}
