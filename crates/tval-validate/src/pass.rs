use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;
use tval_core::{Module, ModulePass, PassContext};
use tval_transform::EngineContext;

use crate::config::ValidationConfig;
use crate::matcher::MatchReport;
use crate::pipeline::validate_module;
use crate::session::ValidationSession;
use crate::verifier::RefinementVerifier;

/// A comparison made by the pass, with the pass whose output it checked.
#[derive(Debug, Clone)]
pub struct PassValidation {
    pub after_pass: Option<String>,
    pub report: MatchReport,
}

struct ValidationState {
    session: ValidationSession,
    verifier: Box<dyn RefinementVerifier>,
    config: ValidationConfig,
    engine: EngineContext,
    validations: Vec<PassValidation>,
}

/// Snapshots the module every time it runs and compares it against the last
/// snapshot of the same session.
///
/// Register one [`hook`](Self::hook) before the first pass to be checked and
/// one after each of them; all hooks share the session and the results.
pub struct TranslationValidationPass {
    state: Rc<RefCell<ValidationState>>,
}

impl TranslationValidationPass {
    pub fn new(
        verifier: Box<dyn RefinementVerifier>,
        config: ValidationConfig,
        engine: EngineContext,
    ) -> Self {
        let state = ValidationState {
            session: ValidationSession::new(config.policy),
            verifier,
            config,
            engine,
            validations: Vec::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Another handle on the same session.
    pub fn hook(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }

    pub fn validations(&self) -> Vec<PassValidation> {
        self.state.borrow().validations.clone()
    }
}

impl ModulePass for TranslationValidationPass {
    fn name(&self) -> &'static str {
        "translation-validation"
    }

    fn description(&self) -> &'static str {
        "Check that the previous pass preserved the behavior of every function"
    }

    fn modifies_ir(&self) -> bool {
        false
    }

    fn run(&mut self, module: Module, ctx: &PassContext) -> Result<Module> {
        let mut state = self.state.borrow_mut();
        let ValidationState {
            session,
            verifier,
            config,
            engine,
            validations,
        } = &mut *state;

        let Some(report) = validate_module(session, &module, verifier.as_mut(), config, engine)?
        else {
            return Ok(module);
        };

        let culprit = ctx.previous_pass.as_deref().unwrap_or("<input>");
        for failure in report.failures() {
            warn!(
                pass = culprit,
                function = %failure.name,
                verdict = %failure.report.verdict,
                "{}",
                failure.report.detail
            );
        }
        validations.push(PassValidation {
            after_pass: ctx.previous_pass.clone(),
            report,
        });
        Ok(module)
    }
}
