use std::io::Write;
use tval_transform::vir;

use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter, Tone};

pub struct VirEmitter {
    config: EmitterConfig,
}

impl VirEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    fn tone(line: &str) -> Tone {
        let trimmed = line.trim_start();
        if trimmed.starts_with(';') {
            Tone::Comment
        } else if trimmed.starts_with("define") {
            Tone::Heading
        } else if trimmed.starts_with('^') {
            Tone::Doubtful
        } else if trimmed.starts_with("trap") {
            Tone::Broken
        } else {
            Tone::Plain
        }
    }
}

impl Default for VirEmitter {
    fn default() -> Self {
        Self::new(EmitterConfig::default())
    }
}

impl Emitter for VirEmitter {
    type Item = vir::Module;

    fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn emit<W: Write>(
        &self,
        module: &vir::Module,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        for line in module.to_string().lines() {
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                EmitHelper::write_toned_line(writer, context, line, Self::tone(line))?;
            }
        }
        Ok(())
    }
}
