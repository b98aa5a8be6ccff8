use std::io::Write;
use tval_validate::{MatchReport, UnmatchedFunction, UnmatchedSeverity, Verdict};

use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter, Tone};

/// Emits the outcome of one comparison: a line per verified pair, the
/// unmatched functions on each side, and a summary.
pub struct ReportEmitter {
    config: EmitterConfig,
}

impl ReportEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    fn verdict_tone(verdict: Verdict) -> Tone {
        match verdict {
            Verdict::Correct => Tone::Good,
            Verdict::Incorrect => Tone::Bad,
            Verdict::Inconclusive => Tone::Doubtful,
            Verdict::Error => Tone::Broken,
        }
    }

    fn severity_tone(severity: UnmatchedSeverity) -> Tone {
        match severity {
            UnmatchedSeverity::Note => Tone::Comment,
            UnmatchedSeverity::Warning => Tone::Doubtful,
            UnmatchedSeverity::Error => Tone::Bad,
        }
    }

    fn emit_unmatched<W: Write>(
        &self,
        writer: &mut W,
        context: &mut EmitContext,
        title: &str,
        severity: UnmatchedSeverity,
        functions: &[UnmatchedFunction],
    ) -> EmitResult {
        if functions.is_empty() {
            return Ok(());
        }
        EmitHelper::write_section(writer, context, title)?;
        for function in functions {
            let line = format!("{}: @{} has no counterpart", severity, function.name);
            EmitHelper::write_toned_line(writer, context, &line, Self::severity_tone(severity))?;
            if context.verbosity.should_print_unmatched() {
                context.indent();
                EmitHelper::write_text(writer, context, &function.printed)?;
                context.dedent();
            }
        }
        Ok(())
    }
}

impl Default for ReportEmitter {
    fn default() -> Self {
        Self::new(EmitterConfig::default())
    }
}

impl Emitter for ReportEmitter {
    type Item = MatchReport;

    fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn emit<W: Write>(
        &self,
        report: &MatchReport,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_comment(writer, context, &format!("validation of {}", report.module))?;

        if !report.pairs.is_empty() {
            EmitHelper::write_section(writer, context, "Pairs")?;
        }
        for pair in &report.pairs {
            let verdict = pair.report.verdict;
            if verdict == Verdict::Correct && !context.verbosity.should_list_passing() {
                continue;
            }
            let tag = context.paint(&format!("{:<12}", verdict.to_string()), Self::verdict_tone(verdict));
            EmitHelper::write_line(writer, context, &format!("{} @{}", tag, pair.name))?;
            if !pair.report.detail.is_empty() && (verdict != Verdict::Correct || context.verbosity.should_print_bodies()) {
                context.indent();
                EmitHelper::write_toned_line(writer, context, &pair.report.detail, Tone::Comment)?;
                context.dedent();
            }
        }

        self.emit_unmatched(
            writer,
            context,
            "Only before",
            report.unmatched_severity,
            &report.unmatched_before,
        )?;
        self.emit_unmatched(
            writer,
            context,
            "Only after",
            report.unmatched_severity,
            &report.unmatched_after,
        )?;

        writeln!(writer)?;
        let summary = format!(
            "{} pairs: {} correct, {} incorrect, {} inconclusive, {} errors; {} unmatched",
            report.pairs.len(),
            report.count(Verdict::Correct),
            report.count(Verdict::Incorrect),
            report.count(Verdict::Inconclusive),
            report.count(Verdict::Error),
            report.unmatched_before.len() + report.unmatched_after.len(),
        );
        let tone = if report.is_failure() {
            Tone::Bad
        } else {
            Tone::Good
        };
        EmitHelper::write_toned_line(writer, context, &summary, tone)
    }
}
