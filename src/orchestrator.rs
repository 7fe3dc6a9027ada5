//! Consultation orchestration loop
//!
//! Drives supervisor -> turn generation -> repetition guard -> state merge
//! until a final report lands or a hard step cap is hit. The loop owns the
//! discussion state exclusively; collaborators only ever see snapshots.

use crate::classifier::{Classification, ContentClassifier, KeywordClassifier};
use crate::config::ConsultationConfig;
use crate::error::{Error, Result};
use crate::generate::{ContextProvider, NoContext, TurnDirective, TurnGenerator, TurnRequest};
use crate::repetition::RepetitionGuard;
use crate::roles::Role;
use crate::state::{DiscussionState, StateSnapshot};
use crate::supervisor::{RouteDecision, Supervisor};
use crate::types::{ConsultationId, Phase, Utterance};
use futures::stream::Stream;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a consultation run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A final report was accepted
    FinalReport,
    /// The caller cancelled the run
    Cancelled,
    /// The hard step cap was reached without a detected final report
    StepCapExhausted,
    /// One role kept failing generation on consecutive attempts
    GeneratorExhausted {
        /// The role that could not produce a turn
        role: Role,
    },
}

/// Result of one consultation run.
///
/// The transcript is always present, even for the non-clean terminations;
/// partial results are valid and returnable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationOutcome {
    /// Run identifier
    pub id: ConsultationId,
    /// All accepted utterances in order
    pub transcript: Vec<Utterance>,
    /// Why the run stopped
    pub reason: TerminationReason,
    /// Loop iterations consumed, including skipped turns
    pub steps: usize,
    /// Phase at termination
    pub phase: Phase,
    /// Quality score at termination
    pub quality_score: f32,
    /// The final report text, present only for clean completions
    pub final_report: Option<String>,
}

impl ConsultationOutcome {
    /// Whether the run completed cleanly with a confirmed final report
    pub fn is_clean(&self) -> bool {
        matches!(self.reason, TerminationReason::FinalReport)
    }
}

/// Incremental event from a streaming consultation
#[derive(Debug, Clone)]
pub enum ConsultationEvent {
    /// One accepted utterance
    Utterance(Utterance),
    /// The run is over
    Finished(ConsultationOutcome),
}

/// Cancellation flag shared between the caller and the loop.
///
/// Checked at the top of every iteration; cancelling leaves the transcript
/// as-is.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a fresh, uncancelled handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Consultation lifecycle hooks
#[derive(Clone, Default)]
pub struct ConsultationHooks {
    /// Called after each accepted utterance
    pub on_utterance: Option<Arc<dyn Fn(&Utterance) + Send + Sync>>,
    /// Called after each routing decision
    pub on_route: Option<Arc<dyn Fn(&RouteDecision) + Send + Sync>>,
    /// Called once with the final outcome
    pub on_complete: Option<Arc<dyn Fn(&ConsultationOutcome) + Send + Sync>>,
}

impl std::fmt::Debug for ConsultationHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsultationHooks")
            .field("on_utterance", &self.on_utterance.is_some())
            .field("on_route", &self.on_route.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Result of one loop iteration
enum StepOutcome {
    /// An utterance was accepted
    Spoke(Utterance),
    /// The turn was skipped (recoverable generation failure)
    Skipped,
    /// The run is over
    Finished(TerminationReason),
}

/// One consultation run: state machine over RUNNING and TERMINATED
pub struct Consultation {
    id: ConsultationId,
    config: ConsultationConfig,
    state: DiscussionState,
    supervisor: Supervisor,
    classifier: Arc<dyn ContentClassifier>,
    generator: Arc<dyn TurnGenerator>,
    context: Arc<dyn ContextProvider>,
    guard: RepetitionGuard,
    hooks: ConsultationHooks,
    cancel: CancelHandle,
    snapshot: Arc<RwLock<StateSnapshot>>,
    steps: usize,
    consecutive_failures: BTreeMap<Role, u32>,
    context_fetches: BTreeMap<Role, usize>,
}

impl std::fmt::Debug for Consultation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consultation")
            .field("id", &self.id)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl Consultation {
    /// Start building a consultation
    pub fn builder() -> ConsultationBuilder {
        ConsultationBuilder::new()
    }

    /// Run identifier
    pub fn id(&self) -> ConsultationId {
        self.id
    }

    /// Cancellation handle for this run
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Shared read-only snapshot, refreshed after every accepted turn
    pub fn snapshot_handle(&self) -> Arc<RwLock<StateSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    /// Current discussion state (read-only)
    pub fn state(&self) -> &DiscussionState {
        &self.state
    }

    /// Drive the loop to termination and return the outcome.
    ///
    /// Never panics on generation trouble: recoverable failures are routed
    /// around, and the two fatal cases surface as termination reasons with
    /// the partial transcript attached.
    pub async fn run(mut self) -> ConsultationOutcome {
        info!(id = %self.id, idea = self.state.business_idea(), "consultation started");
        loop {
            match self.step().await {
                StepOutcome::Finished(reason) => return self.finish(reason),
                StepOutcome::Spoke(_) | StepOutcome::Skipped => {}
            }
        }
    }

    /// Drive the loop as a stream of utterances followed by the outcome
    pub fn into_stream(mut self) -> impl Stream<Item = ConsultationEvent> + Send {
        async_stream::stream! {
            loop {
                match self.step().await {
                    StepOutcome::Spoke(utterance) => {
                        yield ConsultationEvent::Utterance(utterance);
                    }
                    StepOutcome::Skipped => {}
                    StepOutcome::Finished(reason) => {
                        yield ConsultationEvent::Finished(self.finish(reason));
                        break;
                    }
                }
            }
        }
    }

    async fn step(&mut self) -> StepOutcome {
        if self.cancel.is_cancelled() {
            info!(id = %self.id, "consultation cancelled");
            return StepOutcome::Finished(TerminationReason::Cancelled);
        }
        if self.steps >= self.config.hard_step_cap {
            warn!(
                id = %self.id,
                steps = self.steps,
                "hard step cap reached without a final report"
            );
            return StepOutcome::Finished(TerminationReason::StepCapExhausted);
        }
        self.steps += 1;

        let decision = self.supervisor.route(&self.state);
        if let Some(hook) = &self.hooks.on_route {
            hook(&decision);
        }
        let (role, directives) = match decision {
            RouteDecision::Terminate => {
                if self.state.final_report_delivered() {
                    return StepOutcome::Finished(TerminationReason::FinalReport);
                }
                // the router backstop; unreachable with a full board
                error!(id = %self.id, "router terminated without a final report");
                return StepOutcome::Finished(TerminationReason::StepCapExhausted);
            }
            RouteDecision::Speak(role) => (role, Vec::new()),
            RouteDecision::Synthesize(role) => (role, vec![TurnDirective::DeliverFinalReport]),
        };

        let fetched_context = self.fetch_context(role).await;
        let request = self.build_request(role, directives, fetched_context);

        let text = match self.invoke_generator(&request).await {
            Ok(text) => text,
            Err(err) => {
                let failures = self.consecutive_failures.get(&role).copied().unwrap_or(0) + 1;
                self.consecutive_failures.insert(role, failures);
                warn!(id = %self.id, %role, failures, %err, "generation failed, skipping turn");
                if failures >= self.config.max_generation_failures {
                    return StepOutcome::Finished(TerminationReason::GeneratorExhausted { role });
                }
                return StepOutcome::Skipped;
            }
        };
        self.consecutive_failures.insert(role, 0);

        // one bounded regeneration, then accept whatever comes back
        let text = if self.guard.is_repetitive(role, &text) {
            info!(id = %self.id, %role, "near-duplicate response, requesting regeneration");
            let mut retry = request;
            retry.directives.push(TurnDirective::BeDistinct);
            match self.invoke_generator(&retry).await {
                Ok(regenerated) => regenerated,
                Err(err) => {
                    warn!(id = %self.id, %role, %err, "regeneration failed, keeping original");
                    text
                }
            }
        } else {
            text
        };

        let classification = self.classifier.classify(role, &text);
        let utterance = Utterance::new(role, text, self.state.turn_count());
        self.guard.record(role, &utterance.text);
        self.accept(utterance.clone(), &classification);
        StepOutcome::Spoke(utterance)
    }

    fn accept(&mut self, utterance: Utterance, classification: &Classification) {
        debug!(
            id = %self.id,
            speaker = %utterance.speaker,
            sequence = utterance.sequence,
            chars = utterance.text.len(),
            final_report = classification.is_final_report,
            "utterance accepted"
        );
        self.state.apply(utterance.clone(), classification);
        *self.snapshot.write() = self.state.snapshot();
        if let Some(hook) = &self.hooks.on_utterance {
            hook(&utterance);
        }
    }

    async fn fetch_context(&mut self, role: Role) -> Option<String> {
        let fetches = self.context_fetches.get(&role).copied().unwrap_or(0);
        if fetches >= self.config.context_fetch_limit {
            return None;
        }
        self.context_fetches.insert(role, fetches + 1);

        let query = self.state.business_idea().to_string();
        let provider = Arc::clone(&self.context);
        match provider.fetch(role, &query).await {
            Ok(context) => context,
            Err(err) => {
                // best effort only
                warn!(id = %self.id, %role, %err, "context fetch failed");
                None
            }
        }
    }

    fn build_request(
        &self,
        role: Role,
        directives: Vec<TurnDirective>,
        fetched_context: Option<String>,
    ) -> TurnRequest {
        let context_summary = if self.state.call_count(role) >= 1 {
            Some(self.state.context_summary().to_string())
        } else {
            None
        };
        TurnRequest {
            role,
            business_idea: self.state.business_idea().to_string(),
            transcript: self.state.transcript().to_vec(),
            context_summary,
            fetched_context,
            directives,
        }
    }

    async fn invoke_generator(&self, request: &TurnRequest) -> Result<String> {
        let deadline = self.config.generation_timeout();
        match tokio::time::timeout(deadline, self.generator.generate(request)).await {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(Error::generation(request.role, "empty response text"))
            }
            Ok(result) => result,
            Err(_) => Err(Error::GenerationTimeout {
                role: request.role,
                seconds: deadline.as_secs(),
            }),
        }
    }

    fn finish(&mut self, reason: TerminationReason) -> ConsultationOutcome {
        self.state.terminate();
        let final_report = if matches!(reason, TerminationReason::FinalReport) {
            self.state.transcript().last().map(|u| u.text.clone())
        } else {
            None
        };
        let outcome = ConsultationOutcome {
            id: self.id,
            transcript: self.state.transcript().to_vec(),
            reason,
            steps: self.steps,
            phase: self.state.phase(),
            quality_score: self.state.quality_score(),
            final_report,
        };
        *self.snapshot.write() = self.state.snapshot();
        info!(
            id = %self.id,
            ?reason,
            turns = outcome.transcript.len(),
            steps = outcome.steps,
            "consultation finished"
        );
        if let Some(hook) = &self.hooks.on_complete {
            hook(&outcome);
        }
        outcome
    }
}

/// Builder for a consultation run
pub struct ConsultationBuilder {
    business_idea: Option<String>,
    config: ConsultationConfig,
    generator: Option<Arc<dyn TurnGenerator>>,
    classifier: Option<Arc<dyn ContentClassifier>>,
    context: Option<Arc<dyn ContextProvider>>,
    hooks: ConsultationHooks,
    cancel: CancelHandle,
}

impl ConsultationBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            business_idea: None,
            config: ConsultationConfig::default(),
            generator: None,
            classifier: None,
            context: None,
            hooks: ConsultationHooks::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Set the business idea under consultation
    pub fn business_idea(mut self, idea: impl Into<String>) -> Self {
        self.business_idea = Some(idea.into());
        self
    }

    /// Set the orchestration tunables
    pub fn config(mut self, config: ConsultationConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the turn generator
    pub fn generator(mut self, generator: Arc<dyn TurnGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the content classifier (defaults to `KeywordClassifier`)
    pub fn classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Set the context provider (defaults to `NoContext`)
    pub fn context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(provider);
        self
    }

    /// Set the lifecycle hooks
    pub fn hooks(mut self, hooks: ConsultationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the utterance hook
    pub fn on_utterance(mut self, hook: impl Fn(&Utterance) + Send + Sync + 'static) -> Self {
        self.hooks.on_utterance = Some(Arc::new(hook));
        self
    }

    /// Use an externally owned cancellation handle
    pub fn cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the consultation
    pub fn build(self) -> Result<Consultation> {
        self.config.validate()?;
        let business_idea = self
            .business_idea
            .ok_or_else(|| Error::config("business idea is required"))?;
        let generator = self
            .generator
            .ok_or_else(|| Error::config("turn generator is required"))?;
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(KeywordClassifier::new(self.config.report_min_chars)));
        let context = self.context.unwrap_or_else(|| Arc::new(NoContext));

        let state = DiscussionState::new(business_idea, &self.config);
        let snapshot = Arc::new(RwLock::new(state.snapshot()));
        let guard = RepetitionGuard::new(
            self.config.similarity_window,
            self.config.min_informative_chars,
        );

        Ok(Consultation {
            id: ConsultationId::new(),
            supervisor: Supervisor::new(self.config.clone()),
            config: self.config,
            state,
            classifier,
            generator,
            context,
            guard,
            hooks: self.hooks,
            cancel: self.cancel,
            snapshot,
            steps: 0,
            consecutive_failures: BTreeMap::new(),
            context_fetches: BTreeMap::new(),
        })
    }
}

impl Default for ConsultationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
