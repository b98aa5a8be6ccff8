/*! Render modules, verification IR and validation reports for people and tools.
 *
 * A validation run is only useful if its outcome is easy to read: which functions were compared,
 * which pass broke what, and what the functions that could not be paired look like. These emitters
 * turn each stage of the pipeline into text, colored when writing to a terminal, or into JSON for
 * other tools.
 */

pub mod config;
pub mod emitter;
pub mod module_emitter;
pub mod output;
pub mod report_emitter;
pub mod vir_emitter;

pub use config::{EmitterConfig, IndentStyle, VerbosityLevel};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter, Tone};
pub use module_emitter::ProgramEmitter;
pub use output::OutputFormat;
pub use report_emitter::ReportEmitter;
pub use vir_emitter::VirEmitter;
