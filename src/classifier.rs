//! Utterance classification heuristics
//!
//! Extracts the routing signals the supervisor consumes from raw agent
//! text: questions addressed to other roles, topical categories, and
//! whether the text constitutes the terminal final report. The heuristics
//! live behind the `ContentClassifier` trait so they can be swapped for a
//! more robust NLP component without touching the routing policy.

use crate::roles::Role;
use crate::types::Topic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A question one participant directed at another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedQuestion {
    /// Role being asked
    pub target: Role,
    /// The question text, without the addressed name
    pub question: String,
}

/// Routing signals extracted from a single utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Addressed questions in order of appearance (last is most recent)
    pub addressed: Vec<AddressedQuestion>,
    /// Topics whose keyword sets intersect the text
    pub topics: BTreeSet<Topic>,
    /// Whether the text qualifies as the terminal final report
    pub is_final_report: bool,
}

/// Pluggable classification seam
pub trait ContentClassifier: Send + Sync {
    /// Classify one utterance. Must be pure: the same text always yields
    /// the same classification.
    fn classify(&self, speaker: Role, text: &str) -> Classification;
}

/// Marker phrases that may open a final report
const FINAL_REPORT_MARKERS: [&str; 6] = [
    "FINAL REPORT:",
    "FINAL REPORT ",
    "EXECUTIVE SUMMARY",
    "## EXECUTIVE SUMMARY",
    "**FINAL RECOMMENDATION**",
    "FINAL RECOMMENDATION:",
];

/// Keyword sets per topic, matched case-insensitively as substrings
const TOPIC_KEYWORDS: [(Topic, &[&str]); 5] = [
    (
        Topic::Technical,
        &[
            "technology",
            "tech stack",
            "architecture",
            "development",
            "mvp",
            "scalability",
        ],
    ),
    (
        Topic::Financial,
        &[
            "budget",
            "funding",
            "revenue",
            "costs",
            "financial",
            "money",
            "valuation",
            "burn rate",
        ],
    ),
    (
        Topic::Market,
        &[
            "market",
            "competition",
            "customers",
            "users",
            "tam",
            "sam",
            "competitive analysis",
        ],
    ),
    (
        Topic::Operations,
        &[
            "operations",
            "hiring",
            "timeline",
            "execution",
            "team",
            "go-to-market",
        ],
    ),
    (
        Topic::Strategy,
        &[
            "strategy",
            "vision",
            "goals",
            "planning",
            "roadmap",
            "business model",
        ],
    ),
];

/// Regex and keyword based classifier
///
/// Addressed questions are detected by a naming pattern: a role's persona
/// name or label, a comma, then text up to a question mark.
pub struct KeywordClassifier {
    question_patterns: Vec<(Role, Regex)>,
    report_min_chars: usize,
}

impl KeywordClassifier {
    /// Create a classifier with the given final-report length gate
    pub fn new(report_min_chars: usize) -> Self {
        let mut question_patterns = Vec::new();
        for role in Role::ALL {
            for name in [role.persona_name(), role.label()] {
                let pattern = format!(r"(?i)\b{name},\s*([^?]*\?)");
                let regex = Regex::new(&pattern).expect("valid question pattern");
                question_patterns.push((role, regex));
            }
        }
        Self {
            question_patterns,
            report_min_chars,
        }
    }

    fn extract_addressed(&self, speaker: Role, text: &str) -> Vec<AddressedQuestion> {
        // collect (position, question) so matches for different roles stay
        // in order of appearance
        let mut found: Vec<(usize, AddressedQuestion)> = Vec::new();
        for (target, regex) in &self.question_patterns {
            if *target == speaker {
                continue;
            }
            for captures in regex.captures_iter(text) {
                let whole = captures.get(0).expect("match exists");
                let question = captures
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                if question.is_empty() {
                    continue;
                }
                found.push((
                    whole.start(),
                    AddressedQuestion {
                        target: *target,
                        question,
                    },
                ));
            }
        }
        found.sort_by_key(|(start, _)| *start);
        found.dedup_by(|a, b| a.0 == b.0 && a.1.target == b.1.target);
        found.into_iter().map(|(_, q)| q).collect()
    }

    fn extract_topics(&self, text: &str) -> BTreeSet<Topic> {
        let lower = text.to_lowercase();
        TOPIC_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(topic, _)| *topic)
            .collect()
    }

    fn is_final_report(&self, text: &str) -> bool {
        let upper = text.to_uppercase();
        let has_marker = FINAL_REPORT_MARKERS.iter().any(|m| upper.contains(m));
        // a bare marker in a short aside must not end the consultation
        has_marker && text.len() > self.report_min_chars
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, speaker: Role, text: &str) -> Classification {
        Classification {
            addressed: self.extract_addressed(speaker, text),
            topics: self.extract_topics(text),
            is_final_report: self.is_final_report(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new(500)
    }

    #[test]
    fn extracts_question_addressed_by_persona_name() {
        let c = classifier();
        let result = c.classify(Role::Ceo, "Mike, what do you think about the architecture?");
        assert_eq!(result.addressed.len(), 1);
        assert_eq!(result.addressed[0].target, Role::Cto);
        assert_eq!(
            result.addressed[0].question,
            "what do you think about the architecture?"
        );
    }

    #[test]
    fn extracts_question_addressed_by_label() {
        let c = classifier();
        let result = c.classify(Role::Cto, "CFO, can we afford a six month runway?");
        assert_eq!(result.addressed.len(), 1);
        assert_eq!(result.addressed[0].target, Role::Cfo);
    }

    #[test]
    fn name_matching_is_case_insensitive() {
        let c = classifier();
        let result = c.classify(Role::Ceo, "mike, is the stack ready?");
        assert_eq!(result.addressed.len(), 1);
        assert_eq!(result.addressed[0].target, Role::Cto);
    }

    #[test]
    fn ignores_questions_to_the_speaker() {
        let c = classifier();
        let result = c.classify(Role::Cto, "Mike, what would you build first?");
        assert!(result.addressed.is_empty());
    }

    #[test]
    fn multiple_questions_keep_order_of_appearance() {
        let c = classifier();
        let text = "Jennifer, what is our burn rate? Also Tom, can we hire in time?";
        let result = c.classify(Role::Ceo, text);
        assert_eq!(result.addressed.len(), 2);
        assert_eq!(result.addressed[0].target, Role::Cfo);
        assert_eq!(result.addressed[1].target, Role::Coo);
    }

    #[test]
    fn extracts_multiple_topics() {
        let c = classifier();
        let result = c.classify(
            Role::Ceo,
            "The funding plan depends on our tech stack and the market size.",
        );
        assert!(result.topics.contains(&Topic::Financial));
        assert!(result.topics.contains(&Topic::Technical));
        assert!(result.topics.contains(&Topic::Market));
    }

    #[test]
    fn no_signal_is_a_valid_classification() {
        let c = classifier();
        let result = c.classify(Role::Ceo, "I agree with that point.");
        assert!(result.addressed.is_empty());
        assert!(result.topics.is_empty());
        assert!(!result.is_final_report);
    }

    #[test]
    fn final_report_requires_marker_and_length() {
        let c = classifier();
        let short = "FINAL REPORT: looks good.";
        assert!(!c.classify(Role::Ceo, short).is_final_report);

        let padded = format!("FINAL REPORT: {}", "analysis ".repeat(70));
        assert!(padded.len() > 500);
        assert!(c.classify(Role::Ceo, &padded).is_final_report);
    }

    #[test]
    fn final_report_marker_is_case_insensitive() {
        let c = classifier();
        let text = format!("## Executive Summary\n{}", "details ".repeat(70));
        assert!(c.classify(Role::Ceo, &text).is_final_report);
    }

    #[test]
    fn classification_is_idempotent() {
        let c = classifier();
        let text = "Mike, how scalable is the architecture? The budget looks tight.";
        let first = c.classify(Role::Ceo, text);
        let second = c.classify(Role::Ceo, text);
        assert_eq!(first, second);
    }
}
