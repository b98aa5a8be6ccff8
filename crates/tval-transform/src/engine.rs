use once_cell::sync::OnceCell;
use std::fmt;
use tracing::{debug, warn};
use tval_core::codegen::{Endianness, TargetDescriptor};

use crate::{Result, TranslateError};

static ENGINE: OnceCell<EngineContext> = OnceCell::new();

/// Pointer width and byte order the engine reasons under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    pub pointer_bits: u8,
    pub endianness: Endianness,
}

impl DataLayout {
    pub fn for_target(target: &TargetDescriptor) -> Self {
        Self {
            pointer_bits: target.pointer_bits,
            endianness: target.endianness,
        }
    }

    pub fn accepts(&self, target: &TargetDescriptor) -> bool {
        self.pointer_bits == target.pointer_bits && self.endianness == target.endianness
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            pointer_bits: 64,
            endianness: Endianness::Little,
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr{} {}-endian", self.pointer_bits, self.endianness)
    }
}

/// Where translation diagnostics go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiagnosticSink {
    #[default]
    Tracing,
    Stderr,
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineContext {
    layout: DataLayout,
    sink: DiagnosticSink,
}

impl EngineContext {
    /// A context that is not registered process-wide. Useful when several
    /// layouts must coexist, as in tests.
    pub fn new(layout: DataLayout, sink: DiagnosticSink) -> Self {
        Self { layout, sink }
    }

    /// Sets up the process-wide context. The first call wins; later calls get
    /// the existing context back unchanged.
    pub fn initialize(layout: DataLayout, sink: DiagnosticSink) -> &'static EngineContext {
        let mut created = false;
        let engine = ENGINE.get_or_init(|| {
            created = true;
            EngineContext::new(layout, sink)
        });
        if created {
            debug!(layout = %layout, sink = ?sink, "engine context initialized");
        } else if engine.layout != layout || engine.sink != sink {
            debug!(
                requested = %layout,
                active = %engine.layout,
                "engine context already initialized, keeping the first configuration"
            );
        }
        engine
    }

    pub fn global() -> Option<&'static EngineContext> {
        ENGINE.get()
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn sink(&self) -> DiagnosticSink {
        self.sink
    }

    pub fn check_target(&self, target: &TargetDescriptor) -> Result<()> {
        if self.layout.accepts(target) {
            return Ok(());
        }
        Err(TranslateError::IncompatibleTarget {
            expected: self.layout.to_string(),
            found: target.to_string(),
        })
    }

    pub fn report(&self, function: &str, message: &str) {
        match self.sink {
            DiagnosticSink::Tracing => warn!(function, "{}", message),
            DiagnosticSink::Stderr => eprintln!("@{}: {}", function, message),
            DiagnosticSink::Silent => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(pointer_bits: u8, endianness: Endianness) -> TargetDescriptor {
        TargetDescriptor {
            triple: "test-triple".to_string(),
            pointer_bits,
            endianness,
        }
    }

    #[test]
    fn test_layout_compatibility() {
        let engine = EngineContext::new(DataLayout::default(), DiagnosticSink::Silent);
        assert!(engine.check_target(&target(64, Endianness::Little)).is_ok());

        let err = engine
            .check_target(&target(32, Endianness::Little))
            .unwrap_err();
        assert!(matches!(err, TranslateError::IncompatibleTarget { .. }));
        assert!(engine.check_target(&target(64, Endianness::Big)).is_err());
    }

    #[test]
    fn test_first_initialization_wins() {
        let first = EngineContext::initialize(DataLayout::default(), DiagnosticSink::Silent);
        let second = EngineContext::initialize(
            DataLayout {
                pointer_bits: 32,
                endianness: Endianness::Big,
            },
            DiagnosticSink::Stderr,
        );

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.layout(), first.layout());
        assert!(EngineContext::global().is_some());
    }
}
