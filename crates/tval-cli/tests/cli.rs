use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use tval_core::ir_persist::save_module;
use tval_core::{BinaryOp, Module, ModuleBuilder, Type};

/// `offset(x) = x + k` over i8, plus `extra` when asked for.
fn program(k: i64, with_extra: bool) -> Module {
    let mut mb = ModuleBuilder::new("program");
    {
        let mut fb = mb.function("offset", vec![Type::I8], Some(Type::I8));
        let x = fb.param(0);
        let mut entry = fb.entry_block();
        let c = entry.iconst(Type::I8, k);
        let sum = entry.add(Type::I8, x, c);
        entry.ret(Some(sum));
        fb.build().unwrap();
    }
    if with_extra {
        let mut fb = mb.function("extra", vec![], Some(Type::I8));
        let mut entry = fb.entry_block();
        let c = entry.iconst(Type::I8, 1);
        entry.ret(Some(c));
        fb.build().unwrap();
    }
    mb.build().unwrap()
}

fn foldable() -> Module {
    let mut mb = ModuleBuilder::new("arith");
    let mut fb = mb.function("scale", vec![Type::I8], Some(Type::I8));
    let x = fb.param(0);
    let mut entry = fb.entry_block();
    let two = entry.iconst(Type::I8, 2);
    let three = entry.iconst(Type::I8, 3);
    let six = entry.mul(Type::I8, two, three);
    let _unused = entry.binary(BinaryOp::Shl, Type::I8, x, two);
    let result = entry.add(Type::I8, x, six);
    entry.ret(Some(result));
    fb.build().unwrap();
    mb.build().unwrap()
}

fn write(dir: &TempDir, name: &str, module: &Module) -> PathBuf {
    let path = dir.path().join(name);
    save_module(module, &path).unwrap();
    path
}

fn tval() -> Command {
    let mut cmd = Command::cargo_bin("tval").unwrap();
    cmd.env_remove("SDKROOT");
    cmd
}

fn check(before: &Path, after: &Path) -> Command {
    let mut cmd = tval();
    cmd.arg("check").arg(before).arg(after);
    cmd
}

#[test]
fn test_identical_files_pass() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, false));
    let after = write(&dir, "after.json", &program(5, false));

    check(&before, &after)
        .assert()
        .success()
        .stdout(predicate::str::contains("correct      @offset"))
        .stdout(predicate::str::contains("1 correct, 0 incorrect"));
}

#[test]
fn test_miscompile_exits_with_two() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, false));
    let after = write(&dir, "after.json", &program(6, false));

    check(&before, &after)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("incorrect    @offset"));
}

#[test]
fn test_missing_file_reports_and_exits_with_one() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, false));
    let missing = dir.path().join("missing.json");

    check(&before, &missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "error: failed to open file: {}",
            missing.display()
        )));
}

#[test]
fn test_unmatched_severity_decides_the_exit_code() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, true));
    let after = write(&dir, "after.json", &program(5, false));

    check(&before, &after)
        .assert()
        .success()
        .stdout(predicate::str::contains("warning: @extra has no counterpart"));

    check(&before, &after)
        .args(["--unmatched", "error"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("error: @extra has no counterpart"));
}

#[test]
fn test_relative_inputs_are_found_through_import_paths() {
    let dir = tempdir().unwrap();
    write(&dir, "before.json", &program(5, false));
    write(&dir, "after.json", &program(5, false));
    let elsewhere = tempdir().unwrap();

    tval()
        .current_dir(elsewhere.path())
        .arg("check")
        .arg("before.json")
        .arg("after.json")
        .arg("-I")
        .arg(dir.path())
        .assert()
        .success();
}

#[test]
fn test_module_name_override() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, false));
    let after = write(&dir, "after.json", &program(5, false));

    check(&before, &after)
        .args(["--module-name", "renamed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("; validation of renamed"));
}

#[test]
fn test_json_report() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, false));
    let after = write(&dir, "after.json", &program(6, false));

    let output = check(&before, &after)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["pairs"][0]["name"], "offset");
    assert_eq!(report["pairs"][0]["report"]["verdict"], "incorrect");
}

#[test]
fn test_bad_config_is_rejected() {
    let dir = tempdir().unwrap();
    let before = write(&dir, "before.json", &program(5, false));
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{ "verifier": { "step_budget": 0 } }"#).unwrap();

    check(&before, &before)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("step_budget"));
}

#[test]
fn test_dump_stages() {
    let dir = tempdir().unwrap();
    let file = write(&dir, "program.json", &program(5, false));

    tval()
        .arg("dump")
        .arg(&file)
        .args(["--stage", "vir"])
        .assert()
        .success()
        .stdout(predicate::str::contains("; vir module program"))
        .stdout(predicate::str::contains("define @offset(i8) -> i8 {"));

    tval()
        .arg("dump")
        .arg(&file)
        .args(["--stage", "clif"])
        .assert()
        .success()
        .stdout(predicate::str::contains("; offset"));

    tval()
        .arg("dump")
        .arg(&file)
        .args(["--stage", "raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("@offset"));
}

#[test]
fn test_run_validates_every_pass() {
    let dir = tempdir().unwrap();
    let file = write(&dir, "arith.json", &foldable());
    let optimized = dir.path().join("optimized.json");

    tval()
        .arg("run")
        .arg(&file)
        .args(["--passes", "const-fold,dce"])
        .arg("--output")
        .arg(&optimized)
        .assert()
        .success()
        .stdout(predicate::str::contains("after const-fold"))
        .stdout(predicate::str::contains("after dce"))
        .stdout(predicate::str::contains("incorrect    @scale").not());

    assert!(optimized.exists());
}

#[test]
fn test_run_rejects_unknown_pass() {
    let dir = tempdir().unwrap();
    let file = write(&dir, "arith.json", &foldable());

    tval()
        .arg("run")
        .arg(&file)
        .args(["--passes", "inline"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown pass 'inline'"));
}
