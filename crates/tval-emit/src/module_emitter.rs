use std::io::Write;
use tval_core::format::format_module;
use tval_core::Module;

use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter, Tone};

/// Emits a program module at whatever stage it is in.
pub struct ProgramEmitter {
    config: EmitterConfig,
}

impl ProgramEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }
}

impl Default for ProgramEmitter {
    fn default() -> Self {
        Self::new(EmitterConfig::default())
    }
}

impl Emitter for ProgramEmitter {
    type Item = Module;

    fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn emit<W: Write>(
        &self,
        module: &Module,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        for line in format_module(module).lines() {
            let tone = if line.starts_with(';') {
                Tone::Comment
            } else if line.starts_with("func ") || line.starts_with("global ") {
                Tone::Heading
            } else if line.contains("cond_fail") || line.contains("unreachable") {
                Tone::Broken
            } else {
                Tone::Plain
            };
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                EmitHelper::write_toned_line(writer, context, line, tone)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tval_core::{ModuleBuilder, Type};

    #[test]
    fn test_plain_output_matches_the_formatter() {
        let mut mb = ModuleBuilder::new("tiny");
        mb.global("seen", Type::I32);
        let mut fb = mb.function("id", vec![Type::I32], Some(Type::I32));
        let x = fb.param(0);
        fb.entry_block().ret(Some(x));
        fb.build().unwrap();
        let module = mb.build().unwrap();

        let emitter = ProgramEmitter::new(EmitterConfig::plain());
        let text = emitter.emit_to_string(&module).unwrap();
        assert_eq!(text, format_module(&module));
    }
}
