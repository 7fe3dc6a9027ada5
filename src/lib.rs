//! Boardroom - multi-agent business consultation orchestration
//!
//! A small board of role-playing agents (CEO, CTO, CFO, COO) debates a
//! submitted business idea through a supervised, turn-taking discussion
//! until a final report is produced. The crate's core is the deterministic
//! control logic around a non-deterministic text generator:
//!
//! - **Supervisor**: a pure routing policy deciding who speaks next or
//!   when to stop
//! - **Content classifier**: heuristics extracting addressed questions,
//!   topics, and the terminal final report from raw text
//! - **Repetition guard**: near-duplicate suppression with one bounded
//!   regeneration
//! - **Orchestration loop**: step-capped, cancellable driver that
//!   guarantees termination and always returns the (possibly partial)
//!   transcript
//!
//! Text generation and background research are opaque capabilities behind
//! the [`TurnGenerator`] and [`ContextProvider`] traits; an OpenRouter
//! implementation ships in [`openrouter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use boardroom::{Consultation, OpenRouterGenerator};
//! use std::sync::Arc;
//!
//! let consultation = Consultation::builder()
//!     .business_idea("AI bookkeeping for food trucks")
//!     .generator(Arc::new(OpenRouterGenerator::from_env()?))
//!     .build()?;
//! let outcome = consultation.run().await;
//! println!("{}", outcome.final_report.unwrap_or_default());
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod generate;
pub mod openrouter;
pub mod orchestrator;
pub mod repetition;
pub mod roles;
pub mod state;
pub mod supervisor;
pub mod types;

// Re-exports
pub use classifier::{AddressedQuestion, Classification, ContentClassifier, KeywordClassifier};
pub use config::{ConsultationConfig, OpenRouterConfig};
pub use error::{Error, Result};
pub use generate::{ContextProvider, NoContext, TurnDirective, TurnGenerator, TurnRequest};
pub use openrouter::OpenRouterGenerator;
pub use orchestrator::{
    CancelHandle, Consultation, ConsultationBuilder, ConsultationEvent, ConsultationHooks,
    ConsultationOutcome, TerminationReason,
};
pub use repetition::RepetitionGuard;
pub use roles::Role;
pub use state::{DiscussionState, StateSnapshot};
pub use supervisor::{RouteDecision, Supervisor};
pub use types::{ConsultationId, Phase, TokenUsage, Topic, Utterance};
