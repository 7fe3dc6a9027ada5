//! Offline boardroom run with a canned generator
//!
//! Shows the orchestration policy (participation, question routing, topic
//! affinity, forced synthesis) without any network access:
//!
//! ```bash
//! cargo run --example scripted_board
//! ```

use async_trait::async_trait;
use boardroom::{Consultation, Result, Role, TurnGenerator, TurnRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CannedGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TurnGenerator for CannedGenerator {
    async fn generate(&self, request: &TurnRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.wants_final_report() {
            return Ok(format!(
                "FINAL REPORT: The board sees a viable wedge with manageable build risk. \
                 {} We recommend a narrow pilot, a seed budget sized to twelve months of \
                 runway, and a two-person founding engineering team before any broader \
                 go-to-market push.",
                "The full analysis covers market entry, architecture, funding, and staffing \
                 in turn, with concrete milestones for the first two quarters. "
                    .repeat(4)
            ));
        }
        let line = match request.role {
            Role::Ceo => {
                "The vision is sound and the market timing feels right. Mike, how heavy \
                 is the architecture we would need for a first release?"
            }
            Role::Cto => {
                "The tech stack is boring on purpose: one service, one queue, one store. \
                 Development of an MVP is a quarter of work, not a year."
            }
            Role::Cfo => {
                "The budget math works if we keep the burn rate under control until \
                 revenue shows up. Funding a pilot is cheap; funding growth is not."
            }
            Role::Coo => {
                "Execution comes down to hiring two engineers and holding the timeline. \
                 Operations stay simple while we run a single pilot city."
            }
        };
        Ok(format!("{line} (turn {n})"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let consultation = Consultation::builder()
        .business_idea("An AI bookkeeping assistant for food trucks")
        .generator(Arc::new(CannedGenerator {
            calls: AtomicUsize::new(0),
        }))
        .on_utterance(|utterance| {
            println!("--- {} ---", utterance.speaker.label());
            println!("{}\n", utterance.text);
        })
        .build()?;

    let outcome = consultation.run().await;

    println!(
        "Finished: {:?} after {} turns (phase {}, quality {:.2})",
        outcome.reason,
        outcome.transcript.len(),
        outcome.phase,
        outcome.quality_score
    );
    Ok(())
}
