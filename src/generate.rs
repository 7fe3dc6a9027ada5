//! Opaque generation and context-fetch capabilities
//!
//! The engine never produces text itself. It drives externally supplied
//! capabilities: a `TurnGenerator` that writes one utterance for a role,
//! and an optional `ContextProvider` that fetches background material on a
//! best-effort basis.

use crate::error::Result;
use crate::roles::Role;
use crate::types::Utterance;
use async_trait::async_trait;

/// Extra instruction attached to a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirective {
    /// The discussion is converging; deliver the final report
    DeliverFinalReport,
    /// The previous attempt was a near-duplicate; produce something distinct
    BeDistinct,
}

impl TurnDirective {
    /// Instruction text appended to the generation input
    pub fn instruction(&self) -> &'static str {
        match self {
            TurnDirective::DeliverFinalReport => {
                "The consultation is ready for conclusion. Provide the FINAL REPORT: \
                 a comprehensive synthesis of the discussion with an executive summary \
                 and strategic recommendations."
            }
            TurnDirective::BeDistinct => {
                "Your response was too similar to previous messages. Provide a fresh, \
                 distinct perspective and focus on an aspect not yet covered."
            }
        }
    }
}

/// Everything a generator may use to produce one utterance
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Role expected to speak
    pub role: Role,
    /// The idea under consultation
    pub business_idea: String,
    /// Transcript so far, oldest first
    pub transcript: Vec<Utterance>,
    /// Rolling discussion summary, present after the role's first turn
    pub context_summary: Option<String>,
    /// Background material from the context provider, if any
    pub fetched_context: Option<String>,
    /// Instructions for this specific invocation, in order
    pub directives: Vec<TurnDirective>,
}

impl TurnRequest {
    /// Whether this request asks for the final report
    pub fn wants_final_report(&self) -> bool {
        self.directives
            .iter()
            .any(|d| *d == TurnDirective::DeliverFinalReport)
    }
}

/// One-utterance generation capability, externally supplied
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    /// Produce the text of one utterance for the requested role.
    ///
    /// Failures are recoverable from the loop's perspective: the turn is
    /// skipped and routing resumes.
    async fn generate(&self, request: &TurnRequest) -> Result<String>;
}

/// Best-effort background lookup capability
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Fetch background material for a role. `Ok(None)` means nothing
    /// useful was found; errors are logged and otherwise ignored.
    async fn fetch(&self, role: Role, query: &str) -> Result<Option<String>>;
}

/// Context provider that never returns anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextProvider for NoContext {
    async fn fetch(&self, _role: Role, _query: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_detects_final_report_directive() {
        let request = TurnRequest {
            role: Role::Ceo,
            business_idea: "idea".into(),
            transcript: Vec::new(),
            context_summary: None,
            fetched_context: None,
            directives: vec![TurnDirective::DeliverFinalReport],
        };
        assert!(request.wants_final_report());
    }

    #[tokio::test]
    async fn no_context_returns_nothing() {
        let provider = NoContext;
        let fetched = provider.fetch(Role::Cto, "anything").await.unwrap();
        assert!(fetched.is_none());
    }
}
