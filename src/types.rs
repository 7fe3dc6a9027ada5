//! Core type definitions for the boardroom consultation engine

use crate::roles::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a consultation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsultationId(Uuid);

impl ConsultationId {
    /// Create a new random consultation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a consultation ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ConsultationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsultationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One accepted, attributed unit of discussion text.
///
/// Utterances are append-only: once accepted into the transcript they are
/// never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Role that produced this utterance
    pub speaker: Role,
    /// The utterance text as accepted
    pub text: String,
    /// Zero-based position in the transcript
    pub sequence: usize,
    /// Timestamp of acceptance
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    /// Create a new utterance stamped with the current time
    pub fn new(speaker: Role, text: impl Into<String>, sequence: usize) -> Self {
        Self {
            speaker,
            text: text.into(),
            sequence,
            timestamp: Utc::now(),
        }
    }
}

/// Coarse discussion stage, derived from the accepted turn count.
///
/// Transitions are one-directional: Opening -> Discussion -> Synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Initial statements, every role still finding its footing
    Opening,
    /// Open debate between the roles
    Discussion,
    /// Converging toward the final report
    Synthesis,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Opening => "opening",
            Phase::Discussion => "discussion",
            Phase::Synthesis => "synthesis",
        };
        write!(f, "{name}")
    }
}

/// Topical category detected in an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Technical,
    Financial,
    Market,
    Operations,
    Strategy,
}

impl Topic {
    /// All topics in the fixed taxonomy order
    pub const ALL: [Topic; 5] = [
        Topic::Technical,
        Topic::Financial,
        Topic::Market,
        Topic::Operations,
        Topic::Strategy,
    ];

    /// Lowercase tag for logging and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Technical => "technical",
            Topic::Financial => "financial",
            Topic::Market => "market",
            Topic::Operations => "operations",
            Topic::Strategy => "strategy",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token usage statistics reported by a generation backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
    /// Total tokens (prompt + completion)
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a new token usage record
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Add another token usage to this one
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_ordering_is_one_directional() {
        assert!(Phase::Opening < Phase::Discussion);
        assert!(Phase::Discussion < Phase::Synthesis);
    }

    #[test]
    fn token_usage_accumulates() {
        let mut usage = TokenUsage::new(100, 50);
        usage.add(TokenUsage::new(10, 5));
        assert_eq!(usage.prompt_tokens, 110);
        assert_eq!(usage.completion_tokens, 55);
        assert_eq!(usage.total_tokens, 165);
    }
}
