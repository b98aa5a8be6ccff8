/*! Pair functions across two snapshots of a module and check each pair for refinement.
 *
 * A snapshot is a program module cloned, lowered, generated and translated into verification IR.
 * The matcher pairs the functions of two snapshots by name and hands every pair to a
 * [`RefinementVerifier`]. A [`ValidationSession`] holds the snapshot that the next call compares
 * against, and [`TranslationValidationPass`] plugs the whole thing into an optimizer pass manager.
 */

pub mod config;
pub mod differential;
pub mod error;
pub mod interp;
pub mod matcher;
pub mod pass;
pub mod pipeline;
pub mod session;
pub mod verifier;

pub use config::{UnmatchedSeverity, ValidationConfig, VerifierConfig};
pub use differential::DifferentialVerifier;
pub use error::ValidationError;
pub use matcher::{match_and_verify, MatchOptions, MatchReport, PairOutcome, UnmatchedFunction};
pub use pass::{PassValidation, TranslationValidationPass};
pub use pipeline::{snapshot, translation_validation, validate_module};
pub use session::{SnapshotPolicy, ValidationSession};
pub use verifier::{RefinementVerifier, Transformation, Verdict, VerificationReport};

pub type Result<T> = std::result::Result<T, ValidationError>;
