//! Live boardroom consultation against OpenRouter
//!
//! Requires `OPENROUTER_API_KEY` (a `.env` file works). Run with:
//!
//! ```bash
//! cargo run --example boardroom -- "an AI bookkeeping assistant for food trucks"
//! ```

use boardroom::{Consultation, ConsultationEvent, OpenRouterGenerator};
use futures::StreamExt;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let idea = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "An AI bookkeeping assistant for food trucks".to_string());

    let generator = Arc::new(OpenRouterGenerator::from_env()?);
    let consultation = Consultation::builder()
        .business_idea(&idea)
        .generator(generator)
        .build()?;

    println!("--- Boardroom consultation: {idea} ---\n");

    let mut stream = Box::pin(consultation.into_stream());
    while let Some(event) = stream.next().await {
        match event {
            ConsultationEvent::Utterance(utterance) => {
                println!(
                    "--- {} ({}) ---",
                    utterance.speaker.label(),
                    utterance.speaker.persona_name()
                );
                println!("{}\n", utterance.text);
            }
            ConsultationEvent::Finished(outcome) => {
                if outcome.is_clean() {
                    println!(
                        "--- Consultation finished after {} turns ---",
                        outcome.transcript.len()
                    );
                } else {
                    println!(
                        "--- Consultation ended without a confirmed final report ({:?}); \
                         partial transcript above ---",
                        outcome.reason
                    );
                }
            }
        }
    }

    Ok(())
}
