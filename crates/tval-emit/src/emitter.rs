use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use crate::config::{EmitterConfig, VerbosityLevel};

pub type EmitResult = Result<()>;

/// How a line should stand out when colors are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Heading,
    Comment,
    Good,
    Bad,
    Doubtful,
    Broken,
}

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
    pub use_colors: bool,
    pub verbosity: VerbosityLevel,
}

impl EmitContext {
    pub fn new(config: &EmitterConfig) -> Self {
        Self {
            indent_level: 0,
            indent_chars: config.indent_style.to_string(),
            use_colors: config.use_colors,
            verbosity: config.verbosity,
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Heading => text.cyan().bold().to_string(),
            Tone::Comment => text.bright_black().to_string(),
            Tone::Good => text.green().to_string(),
            Tone::Bad => text.red().bold().to_string(),
            Tone::Doubtful => text.yellow().to_string(),
            Tone::Broken => text.magenta().bold().to_string(),
        }
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new(&EmitterConfig::default())
    }
}

pub trait Emitter {
    type Item;

    fn config(&self) -> &EmitterConfig;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult;

    fn emit_to_string(&self, item: &Self::Item) -> Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::new(self.config());
        self.emit(item, &mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct EmitHelper;

impl EmitHelper {
    pub fn write_line<W: Write>(writer: &mut W, context: &EmitContext, text: &str) -> EmitResult {
        Self::write_toned_line(writer, context, text, Tone::Plain)
    }

    pub fn write_toned_line<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        text: &str,
        tone: Tone,
    ) -> EmitResult {
        writeln!(writer, "{}{}", context.get_indent(), context.paint(text, tone))?;
        Ok(())
    }

    /// Writes multi-line text with every line at the current indent.
    pub fn write_text<W: Write>(writer: &mut W, context: &EmitContext, text: &str) -> EmitResult {
        for line in text.lines() {
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                Self::write_line(writer, context, line)?;
            }
        }
        Ok(())
    }

    pub fn write_comment<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        comment: &str,
    ) -> EmitResult {
        Self::write_toned_line(writer, context, &format!("; {}", comment), Tone::Comment)
    }

    pub fn write_section<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        title: &str,
    ) -> EmitResult {
        writeln!(writer)?;
        Self::write_toned_line(writer, context, &format!("=== {} ===", title), Tone::Heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;

    fn plain() -> EmitContext {
        EmitContext::new(&EmitterConfig::plain())
    }

    #[test]
    fn test_indentation_follows_config() {
        let mut ctx = EmitContext::new(&EmitterConfig {
            indent_style: IndentStyle::Tabs,
            ..EmitterConfig::plain()
        });
        ctx.indent();
        ctx.indent();
        assert_eq!(ctx.get_indent(), "\t\t");

        ctx.dedent();
        ctx.dedent();
        ctx.dedent();
        assert_eq!(ctx.indent_level, 0);
    }

    #[test]
    fn test_plain_context_never_paints() {
        let ctx = plain();
        assert_eq!(ctx.paint("incorrect", Tone::Bad), "incorrect");
    }

    #[test]
    fn test_write_text_indents_every_line() {
        let mut buffer = Vec::new();
        let mut ctx = plain();
        ctx.indent();

        EmitHelper::write_text(&mut buffer, &ctx, "a\n\nb\n").unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "  a\n\n  b\n");
    }

    #[test]
    fn test_section_and_comment() {
        let mut buffer = Vec::new();
        let ctx = plain();

        EmitHelper::write_section(&mut buffer, &ctx, "Pairs").unwrap();
        EmitHelper::write_comment(&mut buffer, &ctx, "two functions").unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "\n=== Pairs ===\n; two functions\n"
        );
    }
}
