//! TUI-less "ask" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::CouncilClient;
use crate::core::config::Config;
use crate::core::message::{ConversationMessage, Stage, StageStatus};
use crate::core::session::{EventTransport, SessionUpdate, StreamParams, StreamService};
use crate::ui::transcript::short_model_name;

/// Turns successive snapshots of one turn into progress lines, each stage
/// transition reported once.
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    started: [bool; 3],
    finished: [bool; 3],
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, message: &ConversationMessage) -> Vec<String> {
        let mut lines = Vec::new();
        for stage in Stage::ALL {
            let slot = usize::from(stage.number() - 1);
            match message.status(stage) {
                StageStatus::InFlight if !self.started[slot] => {
                    self.started[slot] = true;
                    lines.push(format!("⏳ {}", running_label(stage)));
                }
                StageStatus::Complete if !self.finished[slot] => {
                    self.started[slot] = true;
                    self.finished[slot] = true;
                    lines.push(format!("✓ {}", finished_label(stage, message)));
                }
                _ => {}
            }
        }
        lines
    }
}

fn running_label(stage: Stage) -> &'static str {
    match stage {
        Stage::One => "Collecting individual responses...",
        Stage::Two => "Peer rankings in progress...",
        Stage::Three => "Chairman is synthesizing the final answer...",
    }
}

fn finished_label(stage: Stage, message: &ConversationMessage) -> String {
    match stage {
        Stage::One => {
            let count = message.stage1.as_ref().map_or(0, Vec::len);
            format!("Stage 1: {count} responses")
        }
        Stage::Two => {
            let leader = message
                .stage2
                .as_ref()
                .and_then(|s| s.aggregate_rankings.first())
                .map(|r| format!(" (top: {})", short_model_name(&r.model)))
                .unwrap_or_default();
            let count = message.stage2.as_ref().map_or(0, |s| s.rankings.len());
            format!("Stage 2: {count} rankings{leader}")
        }
        Stage::Three => {
            let chairman = message
                .stage3
                .as_ref()
                .map(|s| short_model_name(&s.model).to_string())
                .unwrap_or_default();
            format!("Stage 3: final answer from {chairman}")
        }
    }
}

pub async fn run_ask(
    client: CouncilClient,
    config: &Config,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: council ask <prompt>");
        std::process::exit(1);
    }

    let conversation = client.create_conversation().await?;
    debug!(conversation_id = %conversation.id, "Created conversation for ask");
    eprintln!("💬 Conversation {}", conversation.id);

    let transport: Arc<dyn EventTransport> = Arc::new(client);
    let (stream_service, mut rx) = StreamService::new();
    stream_service.spawn_stream(StreamParams {
        transport,
        conversation_id: conversation.id,
        content: prompt,
        streaming: config.streaming_enabled(),
        cancel_token: CancellationToken::new(),
        stream_id: 0,
    });

    let mut progress = ProgressPrinter::new();
    let mut last = None;
    while let Some((update, _)) = rx.recv().await {
        match update {
            SessionUpdate::Snapshot(message) => {
                for line in progress.observe(&message) {
                    eprintln!("{line}");
                }
                last = Some(message);
            }
            SessionUpdate::Title(title) => eprintln!("📝 {title}"),
            SessionUpdate::End => break,
        }
    }

    let Some(message) = last else {
        eprintln!("❌ Error: the council returned nothing");
        std::process::exit(1);
    };
    if let Some(error) = &message.error {
        eprintln!("❌ Error: {error}");
        std::process::exit(1);
    }

    let mut stdout = io::stdout();
    if let Some(stage3) = &message.stage3 {
        writeln!(stdout, "{}", stage3.response)?;
    }
    stdout.flush()?;
    Ok(())
}
