//! Turn-taking policy - who speaks next, and when the discussion ends
//!
//! The supervisor is a pure, total function from discussion state to a
//! routing decision. Rules are evaluated in strict priority order and the
//! first match wins, so every reachable state maps to exactly one decision.

use crate::config::ConsultationConfig;
use crate::roles::Role;
use crate::state::DiscussionState;
use tracing::debug;

/// Routing decision for the next orchestration step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Route the next turn to this role
    Speak(Role),
    /// Force the synthesizer to deliver the final report.
    ///
    /// The one sanctioned exception to the no-consecutive-speaker rule.
    Synthesize(Role),
    /// Stop the consultation
    Terminate,
}

/// Deterministic router over the discussion state
#[derive(Debug, Clone)]
pub struct Supervisor {
    config: ConsultationConfig,
}

impl Supervisor {
    /// Create a supervisor with the given tunables
    pub fn new(config: ConsultationConfig) -> Self {
        Self { config }
    }

    /// Decide the next actor or termination for the current state.
    ///
    /// Priority order:
    /// 1. terminate once a final report has been accepted
    /// 2. force the synthesizer when the discussion is due to converge
    /// 3. complete participation for roles that have never spoken
    /// 4. answer the most recently addressed question
    /// 5. follow topic affinity to the owning role
    /// 6. balance load toward the least-called role
    /// 7. terminate (backstop; unreachable with two or more roles)
    ///
    /// No rule routes to the last speaker except rule 2's explicit override.
    pub fn route(&self, state: &DiscussionState) -> RouteDecision {
        let decision = self.decide(state);
        debug!(turn = state.turn_count(), ?decision, "supervisor routing");
        decision
    }

    fn decide(&self, state: &DiscussionState) -> RouteDecision {
        // rule 1: the report is in
        if state.final_report_delivered() {
            return RouteDecision::Terminate;
        }

        // rule 2: forced synthesis
        if self.synthesis_due(state) {
            return RouteDecision::Synthesize(Role::SYNTHESIZER);
        }

        // rule 3: everyone speaks at least once, in fixed role order
        for role in Role::ALL {
            if !state.has_spoken(role) && state.last_speaker() != Some(role) {
                return RouteDecision::Speak(role);
            }
        }

        let steering = state.turn_count() < self.config.synthesis_threshold;

        // rule 4: most recent addressed question wins
        if steering {
            if let Some(question) = state.pending_addressed_questions().last() {
                if state.last_speaker() != Some(question.target) {
                    return RouteDecision::Speak(question.target);
                }
            }
        }

        // rule 5: topic affinity
        if steering {
            for topic in state.recent_topics() {
                let owner = Role::owner_of(*topic);
                if state.last_speaker() != Some(owner) {
                    return RouteDecision::Speak(owner);
                }
            }
        }

        // rule 6: least-called role, ties broken by fixed order
        let fallback = Role::ALL
            .iter()
            .filter(|role| state.last_speaker() != Some(**role))
            .min_by_key(|role| state.call_count(**role));
        if let Some(role) = fallback {
            return RouteDecision::Speak(*role);
        }

        // rule 7: nothing left to route (requires a single-role board)
        RouteDecision::Terminate
    }

    /// Whether the discussion must now converge on the final report.
    ///
    /// Requires full participation, then any of: the synthesis threshold
    /// reached, quality collapsed after the grace period, or the absolute
    /// discussion-turn limit reached.
    fn synthesis_due(&self, state: &DiscussionState) -> bool {
        if !state.all_have_spoken() {
            return false;
        }
        let turns = state.turn_count();
        if turns >= self.config.synthesis_threshold {
            return true;
        }
        if turns >= self.config.max_discussion_turns {
            return true;
        }
        self.config.end_on_quality_collapse
            && turns >= self.config.quality_grace_turns
            && state.quality_score() < self.config.quality_floor
    }
}
