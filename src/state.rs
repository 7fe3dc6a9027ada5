//! Discussion state - the authoritative record of one consultation
//!
//! A single mutable aggregate threaded through every orchestration step.
//! It is owned exclusively by the orchestration loop; everything else sees
//! read-only snapshots.

use crate::classifier::{AddressedQuestion, Classification};
use crate::config::ConsultationConfig;
use crate::roles::Role;
use crate::types::{Phase, Topic, Utterance};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How many recent utterances feed the quality score
const QUALITY_WINDOW: usize = 3;
/// Utterance length (chars) that counts as fully substantive
const QUALITY_LENGTH_NORM: f32 = 500.0;
/// Turns before the quality score starts decaying
const QUALITY_GRACE: usize = 5;
/// How many recent utterances feed the rolling summary
const SUMMARY_WINDOW: usize = 8;
/// Per-role excerpt length in the rolling summary
const SUMMARY_EXCERPT_CHARS: usize = 100;

/// The mutable conversation record for one consultation run
#[derive(Debug, Clone)]
pub struct DiscussionState {
    config: ConsultationConfig,
    business_idea: String,
    transcript: Vec<Utterance>,
    participation: BTreeMap<Role, bool>,
    call_counts: BTreeMap<Role, usize>,
    last_speaker: Option<Role>,
    pending_addressed_questions: Vec<AddressedQuestion>,
    recent_topics: Vec<Topic>,
    topics_seen: BTreeSet<Topic>,
    phase: Phase,
    quality_score: f32,
    context_summary: String,
    final_report_delivered: bool,
    terminated: bool,
}

impl DiscussionState {
    /// Create the state for a fresh consultation seeded with the idea
    pub fn new(business_idea: impl Into<String>, config: &ConsultationConfig) -> Self {
        let business_idea = business_idea.into();
        let context_summary = format!("Analyzing business idea: {business_idea}");
        Self {
            config: config.clone(),
            business_idea,
            transcript: Vec::new(),
            participation: Role::ALL.iter().map(|r| (*r, false)).collect(),
            call_counts: Role::ALL.iter().map(|r| (*r, 0)).collect(),
            last_speaker: None,
            pending_addressed_questions: Vec::new(),
            recent_topics: Vec::new(),
            topics_seen: BTreeSet::new(),
            phase: Phase::Opening,
            quality_score: 1.0,
            context_summary,
            final_report_delivered: false,
            terminated: false,
        }
    }

    /// Merge one accepted utterance and its classification into the state.
    ///
    /// Signals are recomputed incrementally from the new utterance only;
    /// the transcript is never rescanned.
    pub fn apply(&mut self, utterance: Utterance, classification: &Classification) {
        debug_assert!(!self.terminated, "no utterances after termination");
        let speaker = utterance.speaker;

        self.transcript.push(utterance);
        self.participation.insert(speaker, true);
        *self.call_counts.entry(speaker).or_insert(0) += 1;
        self.last_speaker = Some(speaker);

        // derived from the most recent utterance, replacing earlier signals
        self.pending_addressed_questions = classification.addressed.clone();
        self.recent_topics = classification.topics.iter().copied().collect();
        self.topics_seen.extend(classification.topics.iter().copied());

        // phase never regresses
        self.phase = self.phase.max(self.phase_for(self.turn_count()));
        self.quality_score = self.recompute_quality();
        self.context_summary = self.rebuild_summary();

        if classification.is_final_report {
            self.final_report_delivered = true;
            self.terminated = true;
        }
    }

    /// Mark the state terminated without a final report (cancellation or
    /// step-cap exhaustion)
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    fn phase_for(&self, turn_count: usize) -> Phase {
        if turn_count <= self.config.opening_turns {
            Phase::Opening
        } else if turn_count <= self.config.synthesis_threshold {
            Phase::Discussion
        } else {
            Phase::Synthesis
        }
    }

    fn recompute_quality(&self) -> f32 {
        let count = self.turn_count();
        if count <= QUALITY_GRACE {
            return 1.0;
        }
        let recent: Vec<&Utterance> = self
            .transcript
            .iter()
            .rev()
            .take(QUALITY_WINDOW)
            .collect();
        let avg_length = recent.iter().map(|u| u.text.len()).sum::<usize>() as f32
            / recent.len().max(1) as f32;
        let length_quality = (avg_length / QUALITY_LENGTH_NORM).min(1.0);
        let count_penalty = (1.0 - (count - QUALITY_GRACE) as f32 * 0.1).max(0.3);
        length_quality * count_penalty
    }

    fn rebuild_summary(&self) -> String {
        if self.turn_count() <= QUALITY_GRACE {
            return format!("Analyzing business idea: {}", self.business_idea);
        }
        let mut latest: BTreeMap<Role, &str> = BTreeMap::new();
        for utterance in self.transcript.iter().rev().take(SUMMARY_WINDOW) {
            latest.entry(utterance.speaker).or_insert(utterance.text.as_str());
        }
        let mut parts = vec![format!("Business: {}", self.business_idea)];
        for role in Role::ALL {
            if let Some(text) = latest.get(&role) {
                let excerpt: String = text.chars().take(SUMMARY_EXCERPT_CHARS).collect();
                let suffix = if text.chars().count() > SUMMARY_EXCERPT_CHARS {
                    "..."
                } else {
                    ""
                };
                parts.push(format!("{}: {excerpt}{suffix}", role.label()));
            }
        }
        parts.join(" | ")
    }

    /// The idea submitted for consultation
    pub fn business_idea(&self) -> &str {
        &self.business_idea
    }

    /// All accepted utterances in order
    pub fn transcript(&self) -> &[Utterance] {
        &self.transcript
    }

    /// Number of accepted utterances
    pub fn turn_count(&self) -> usize {
        self.transcript.len()
    }

    /// Whether the role has spoken at least once
    pub fn has_spoken(&self, role: Role) -> bool {
        self.participation.get(&role).copied().unwrap_or(false)
    }

    /// Whether every role has spoken at least once
    pub fn all_have_spoken(&self) -> bool {
        Role::ALL.iter().all(|r| self.has_spoken(*r))
    }

    /// Accepted utterances for the role
    pub fn call_count(&self, role: Role) -> usize {
        self.call_counts.get(&role).copied().unwrap_or(0)
    }

    /// Speaker of the most recent utterance
    pub fn last_speaker(&self) -> Option<Role> {
        self.last_speaker
    }

    /// Questions the most recent utterance addressed at other roles
    pub fn pending_addressed_questions(&self) -> &[AddressedQuestion] {
        &self.pending_addressed_questions
    }

    /// Topics of the most recent utterance, in taxonomy order
    pub fn recent_topics(&self) -> &[Topic] {
        &self.recent_topics
    }

    /// Topics seen anywhere in the discussion
    pub fn topics_seen(&self) -> &BTreeSet<Topic> {
        &self.topics_seen
    }

    /// Current discussion phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current conversation quality score in [0, 1]
    pub fn quality_score(&self) -> f32 {
        self.quality_score
    }

    /// Rolling summary of the discussion so far
    pub fn context_summary(&self) -> &str {
        &self.context_summary
    }

    /// Whether a final report has been accepted
    pub fn final_report_delivered(&self) -> bool {
        self.final_report_delivered
    }

    /// Whether the consultation is over
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Produce a read-only snapshot for presentation layers
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            turn_count: self.turn_count(),
            phase: self.phase,
            quality_score: self.quality_score,
            last_speaker: self.last_speaker,
            participation: self.participation.clone(),
            call_counts: self.call_counts.clone(),
            topics_seen: self.topics_seen.clone(),
            pending_questions: self.pending_addressed_questions.len(),
            context_summary: self.context_summary.clone(),
            final_report_delivered: self.final_report_delivered,
            terminated: self.terminated,
        }
    }
}

/// Read-only view of the discussion state after a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Number of accepted utterances
    pub turn_count: usize,
    /// Current phase
    pub phase: Phase,
    /// Current quality score
    pub quality_score: f32,
    /// Most recent speaker
    pub last_speaker: Option<Role>,
    /// Per-role participation flags
    pub participation: BTreeMap<Role, bool>,
    /// Per-role accepted utterance counts
    pub call_counts: BTreeMap<Role, usize>,
    /// Topics seen so far
    pub topics_seen: BTreeSet<Topic>,
    /// Number of questions pending from the most recent utterance
    pub pending_questions: usize,
    /// Rolling discussion summary
    pub context_summary: String,
    /// Whether the final report has been accepted
    pub final_report_delivered: bool,
    /// Whether the run is over
    pub terminated: bool,
}
