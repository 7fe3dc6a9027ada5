//! Near-duplicate suppression for generated turns
//!
//! Role-playing generators drift into repeating themselves late in a
//! discussion. The guard keeps a short window of signatures per role and
//! flags candidates that collapse to a signature already seen, so the
//! orchestration loop can request one regeneration before accepting.

use crate::roles::Role;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

/// Filler words stripped before signature computation, so swapping one
/// buzzword for another does not make a response "new"
const FILLER_WORDS: [&str; 7] = [
    "innovative",
    "cutting-edge",
    "scalable",
    "disruptive",
    "game-changing",
    "exciting",
    "strategic",
];

/// Compute the similarity signature of a response text.
///
/// Lowercases, collapses whitespace, strips filler words, then takes a
/// truncated hex digest. Texts that differ only in casing, spacing, or
/// buzzword choice collapse to the same signature.
pub fn response_signature(text: &str) -> String {
    let normalized = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut stripped = normalized;
    for word in FILLER_WORDS {
        stripped = stripped.replace(word, "");
    }
    let digest = Sha256::digest(stripped.as_bytes());
    let mut hex = String::with_capacity(10);
    for byte in digest.iter().take(5) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Detects near-duplicate responses per role over a bounded window
#[derive(Debug, Clone)]
pub struct RepetitionGuard {
    window: usize,
    min_informative_chars: usize,
    history: HashMap<Role, VecDeque<String>>,
}

impl RepetitionGuard {
    /// Create a guard keeping `window` signatures per role
    pub fn new(window: usize, min_informative_chars: usize) -> Self {
        Self {
            window: window.max(1),
            min_informative_chars,
            history: HashMap::new(),
        }
    }

    /// Whether a candidate text is a near-duplicate of the role's recent
    /// accepted utterances, or too short to carry information
    pub fn is_repetitive(&self, role: Role, text: &str) -> bool {
        if text.len() < self.min_informative_chars {
            return true;
        }
        let signature = response_signature(text);
        self.history
            .get(&role)
            .map(|recent| recent.contains(&signature))
            .unwrap_or(false)
    }

    /// Record an accepted utterance's signature for the role
    pub fn record(&mut self, role: Role, text: &str) {
        let recent = self.history.entry(role).or_default();
        recent.push_back(response_signature(text));
        while recent.len() > self.window {
            recent.pop_front();
        }
    }
}
