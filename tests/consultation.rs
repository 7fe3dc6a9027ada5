//! End-to-end orchestration scenarios with scripted generators

use async_trait::async_trait;
use boardroom::{
    CancelHandle, Consultation, ConsultationConfig, ConsultationEvent, Error, Result, Role,
    TerminationReason, TurnGenerator, TurnRequest, Utterance,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Neutral filler with no questions, topics, or report markers
fn filler(role: Role, n: usize) -> String {
    let mut text = format!("{} perspective entry {n}. ", role.persona_name());
    while text.len() < 200 {
        text.push_str("Further deliberation follows in due course. ");
    }
    text
}

fn final_report() -> String {
    format!(
        "FINAL REPORT: {}",
        "Balanced recommendation with concrete follow-ups. ".repeat(12)
    )
}

/// Returns varied filler; optionally honors the final-report directive
struct FillerGenerator {
    calls: AtomicUsize,
    honor_final_report: bool,
}

impl FillerGenerator {
    fn new(honor_final_report: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            honor_final_report,
        }
    }
}

#[async_trait]
impl TurnGenerator for FillerGenerator {
    async fn generate(&self, request: &TurnRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.honor_final_report && request.wants_final_report() {
            return Ok(final_report());
        }
        Ok(filler(request.role, n))
    }
}

/// Always returns the exact same text and never a final report
struct EchoGenerator {
    calls: AtomicUsize,
    distinct_requests: AtomicUsize,
}

const ECHO_TEXT: &str = "We keep circling back to the same considerations without adding \
    much new substance to the record here today, colleagues of mine.";

impl EchoGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            distinct_requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TurnGenerator for EchoGenerator {
    async fn generate(&self, request: &TurnRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request
            .directives
            .contains(&boardroom::TurnDirective::BeDistinct)
        {
            self.distinct_requests.fetch_add(1, Ordering::SeqCst);
        }
        Ok(ECHO_TEXT.to_string())
    }
}

/// Fails a configured number of times for one role, filler otherwise
struct FailingGenerator {
    fail_role: Role,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl FailingGenerator {
    fn new(fail_role: Role, failures: usize) -> Self {
        Self {
            fail_role,
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TurnGenerator for FailingGenerator {
    async fn generate(&self, request: &TurnRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.role == self.fail_role {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(Error::generation(request.role, "provider unavailable"));
            }
        }
        if request.wants_final_report() {
            return Ok(final_report());
        }
        Ok(filler(request.role, n))
    }
}

/// Never completes within any per-turn deadline
struct StalledGenerator;

#[async_trait]
impl TurnGenerator for StalledGenerator {
    async fn generate(&self, _request: &TurnRequest) -> Result<String> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

/// Emits a question addressed at the CFO on its fifth call
struct QuestionScriptGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TurnGenerator for QuestionScriptGenerator {
    async fn generate(&self, request: &TurnRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.wants_final_report() {
            return Ok(final_report());
        }
        if n == 4 {
            let mut text = "Jennifer, could you weigh in next? ".to_string();
            while text.len() < 150 {
                text.push_str("Further deliberation follows in due course. ");
            }
            return Ok(text);
        }
        Ok(filler(request.role, n))
    }
}

fn steady_config() -> ConsultationConfig {
    ConsultationConfig::default().with_end_on_quality_collapse(false)
}

#[tokio::test]
async fn forced_synthesis_yields_nine_turn_run() {
    let generator = Arc::new(FillerGenerator::new(true));
    let consultation = Consultation::builder()
        .business_idea("AI bookkeeping for food trucks")
        .config(steady_config())
        .generator(generator.clone())
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.reason, TerminationReason::FinalReport);
    assert_eq!(outcome.transcript.len(), 9);
    assert_eq!(outcome.transcript.last().unwrap().speaker, Role::Ceo);
    assert!(outcome
        .final_report
        .as_deref()
        .unwrap()
        .contains("FINAL REPORT"));

    // everyone spoke during the opening rotation
    let openers: Vec<Role> = outcome.transcript[..4].iter().map(|u| u.speaker).collect();
    for role in Role::ALL {
        assert!(openers.contains(&role), "{role} missing from opening");
    }
    // sequence indices line up with transcript order
    for (i, utterance) in outcome.transcript.iter().enumerate() {
        assert_eq!(utterance.sequence, i);
    }
}

#[tokio::test]
async fn no_consecutive_speakers_in_a_clean_run() {
    let generator = Arc::new(FillerGenerator::new(true));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(steady_config())
        .generator(generator)
        .build()
        .unwrap();

    let outcome = consultation.run().await;
    for pair in outcome.transcript.windows(2) {
        assert_ne!(pair[0].speaker, pair[1].speaker);
    }
}

#[tokio::test]
async fn forced_synthesis_may_override_consecutive_speaker_rule_once() {
    // threshold 5 lands the synthesis turn right after a CEO turn
    let config = steady_config().with_synthesis_threshold(5);
    let generator = Arc::new(FillerGenerator::new(true));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(config)
        .generator(generator)
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.transcript.len(), 6);
    let consecutive: Vec<usize> = outcome
        .transcript
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].speaker == pair[1].speaker)
        .map(|(i, _)| i)
        .collect();
    // exactly one violation, at the terminal forced-synthesis turn
    assert_eq!(consecutive, vec![4]);
    assert_eq!(outcome.transcript.last().unwrap().speaker, Role::Ceo);
}

#[tokio::test]
async fn adversarial_generation_still_terminates_within_step_cap() {
    let generator = Arc::new(FillerGenerator::new(false));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .generator(generator)
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert!(!outcome.is_clean());
    assert_eq!(outcome.reason, TerminationReason::StepCapExhausted);
    assert_eq!(outcome.transcript.len(), 30);
    assert!(outcome.final_report.is_none());
}

#[tokio::test]
async fn repetition_guard_regenerates_exactly_once_per_duplicate() {
    let config = steady_config()
        .with_synthesis_threshold(4)
        .with_hard_step_cap(6);
    let generator = Arc::new(EchoGenerator::new());
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(config)
        .generator(generator.clone())
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    // forward progress despite constant repetition
    assert_eq!(outcome.transcript.len(), 6);
    assert_eq!(outcome.reason, TerminationReason::StepCapExhausted);
    // turns 5 and 6 were each regenerated exactly once and then accepted
    assert_eq!(generator.distinct_requests.load(Ordering::SeqCst), 2);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 8);
    assert_eq!(outcome.transcript[4].text, ECHO_TEXT);
}

#[tokio::test]
async fn addressed_question_steers_routing() {
    let generator = Arc::new(QuestionScriptGenerator {
        calls: AtomicUsize::new(0),
    });
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(steady_config())
        .generator(generator)
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert!(outcome.is_clean());
    // turn 5 asked Jennifer a question; turn 6 is hers
    assert_eq!(outcome.transcript[4].speaker, Role::Ceo);
    assert!(outcome.transcript[4].text.starts_with("Jennifer,"));
    assert_eq!(outcome.transcript[5].speaker, Role::Cfo);
}

#[tokio::test]
async fn cancellation_returns_partial_transcript() {
    let cancel = CancelHandle::new();
    let hook_cancel = cancel.clone();
    let generator = Arc::new(FillerGenerator::new(true));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(steady_config())
        .generator(generator)
        .cancel_handle(cancel)
        .on_utterance(move |utterance: &Utterance| {
            if utterance.sequence == 2 {
                hook_cancel.cancel();
            }
        })
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert_eq!(outcome.reason, TerminationReason::Cancelled);
    assert_eq!(outcome.transcript.len(), 3);
    assert!(!outcome.is_clean());
}

#[tokio::test]
async fn repeated_generation_failure_escalates_for_that_role() {
    let generator = Arc::new(FailingGenerator::new(Role::Cto, usize::MAX));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(steady_config())
        .generator(generator)
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert_eq!(
        outcome.reason,
        TerminationReason::GeneratorExhausted { role: Role::Cto }
    );
    // only the CEO's opening landed before the CTO stalled the rotation
    assert_eq!(outcome.transcript.len(), 1);
    assert!(!outcome.is_clean());
}

#[tokio::test]
async fn transient_generation_failure_is_skipped_and_recovered() {
    let generator = Arc::new(FailingGenerator::new(Role::Cto, 1));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(steady_config())
        .generator(generator)
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.transcript.len(), 9);
    // the skipped attempt cost one extra step
    assert_eq!(outcome.steps, 11);
}

#[tokio::test(start_paused = true)]
async fn generation_timeout_is_treated_as_recoverable_failure() {
    let config = steady_config()
        .with_generation_timeout(std::time::Duration::from_secs(5));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(config)
        .generator(Arc::new(StalledGenerator))
        .build()
        .unwrap();

    let outcome = consultation.run().await;

    assert_eq!(
        outcome.reason,
        TerminationReason::GeneratorExhausted { role: Role::Ceo }
    );
    assert!(outcome.transcript.is_empty());
}

#[tokio::test]
async fn streaming_run_reports_monotonic_phases_and_snapshots() {
    let generator = Arc::new(FillerGenerator::new(true));
    let consultation = Consultation::builder()
        .business_idea("test idea")
        .config(steady_config())
        .generator(generator)
        .build()
        .unwrap();

    let snapshot = consultation.snapshot_handle();
    let mut stream = Box::pin(consultation.into_stream());

    let mut phases = Vec::new();
    let mut utterances = 0usize;
    let mut finished = None;
    while let Some(event) = stream.next().await {
        match event {
            ConsultationEvent::Utterance(_) => {
                utterances += 1;
                let snap = snapshot.read().clone();
                assert_eq!(snap.turn_count, utterances);
                phases.push(snap.phase);
            }
            ConsultationEvent::Finished(outcome) => finished = Some(outcome),
        }
    }

    let outcome = finished.expect("stream ends with an outcome");
    assert!(outcome.is_clean());
    assert_eq!(utterances, outcome.transcript.len());
    for pair in phases.windows(2) {
        assert!(pair[0] <= pair[1], "phase regressed: {pair:?}");
    }
    let final_snapshot = snapshot.read().clone();
    assert!(final_snapshot.terminated);
    assert!(final_snapshot.final_report_delivered);

    // snapshots and outcomes serialize for presentation layers
    serde_json::to_string(&final_snapshot).unwrap();
    serde_json::to_string(&outcome).unwrap();
}
