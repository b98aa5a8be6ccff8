use pretty_assertions::assert_eq;
use tval_emit::output::write_json;
use tval_emit::{EmitterConfig, Emitter, ReportEmitter, VerbosityLevel, VirEmitter};
use tval_transform::vir::{Block, BlockRef, Function, Module, Terminator, Type, Value};
use tval_validate::{
    MatchReport, PairOutcome, UnmatchedFunction, UnmatchedSeverity, Verdict, VerificationReport,
};

fn pair(name: &str, verdict: Verdict, detail: &str) -> PairOutcome {
    PairOutcome {
        name: name.to_string(),
        report: VerificationReport::new(verdict, detail),
    }
}

fn report() -> MatchReport {
    MatchReport {
        module: "program".to_string(),
        pairs: vec![
            pair("kept", Verdict::Correct, "identical up to renaming"),
            pair("broken", Verdict::Incorrect, "with arg0 = 0x0: source returned 0x1, target returned 0x2"),
        ],
        unmatched_before: vec![UnmatchedFunction {
            name: "old".to_string(),
            printed: "define @old() -> void {\n^0():\n  ret\n}\n".to_string(),
        }],
        unmatched_after: Vec::new(),
        unmatched_severity: UnmatchedSeverity::Warning,
    }
}

fn config(verbosity: VerbosityLevel) -> EmitterConfig {
    EmitterConfig {
        verbosity,
        ..EmitterConfig::plain()
    }
}

#[test]
fn test_normal_report() {
    let text = ReportEmitter::new(config(VerbosityLevel::Normal))
        .emit_to_string(&report())
        .unwrap();

    assert_eq!(
        text,
        "; validation of program\n\
         \n\
         === Pairs ===\n\
         correct      @kept\n\
         incorrect    @broken\n\
         \x20 with arg0 = 0x0: source returned 0x1, target returned 0x2\n\
         \n\
         === Only before ===\n\
         warning: @old has no counterpart\n\
         \x20 define @old() -> void {\n\
         \x20 ^0():\n\
         \x20   ret\n\
         \x20 }\n\
         \n\
         2 pairs: 1 correct, 1 incorrect, 0 inconclusive, 0 errors; 1 unmatched\n"
    );
}

#[test]
fn test_quiet_report_hides_passing_pairs() {
    let text = ReportEmitter::new(config(VerbosityLevel::Quiet))
        .emit_to_string(&report())
        .unwrap();

    assert!(!text.contains("@kept"));
    assert!(text.contains("@broken"));
    assert!(text.contains("warning: @old has no counterpart"));
    assert!(!text.contains("define @old"));
}

#[test]
fn test_verbose_report_prints_unmatched_bodies() {
    let text = ReportEmitter::new(config(VerbosityLevel::Verbose))
        .emit_to_string(&report())
        .unwrap();

    assert!(text.contains("  define @old() -> void {"));
    assert!(text.contains("identical up to renaming"));
}

#[test]
fn test_json_report() {
    let mut buffer = Vec::new();
    write_json(&mut buffer, &report()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

    assert_eq!(value["module"], "program");
    assert_eq!(value["pairs"][1]["report"]["verdict"], "incorrect");
    assert_eq!(value["unmatched_before"][0]["name"], "old");
}

#[test]
fn test_vir_emitter_plain_text() {
    let mut module = Module::new("m");
    module.push(Function {
        name: "id".to_string(),
        params: vec![Type::I16],
        result: Some(Type::I16),
        blocks: vec![Block {
            id: BlockRef(0),
            params: vec![(Value(0), Type::I16)],
            insts: Vec::new(),
            term: Terminator::Return(vec![Value(0)]),
        }],
    });

    let text = VirEmitter::new(EmitterConfig::plain())
        .emit_to_string(&module)
        .unwrap();
    assert_eq!(
        text,
        "; vir module m\n\ndefine @id(i16) -> i16 {\n^0(%0: i16):\n  ret %0\n}\n"
    );
}
