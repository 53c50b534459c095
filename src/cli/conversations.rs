//! Conversation listing and housekeeping

use std::error::Error;

use chrono::{DateTime, NaiveDateTime};

use crate::api::{ConversationSummary, CouncilClient};
use crate::core::message::ConversationMessage;
use crate::ui::transcript::short_model_name;

/// Render a backend timestamp for humans. Both RFC 3339 and the naive ISO
/// form the backend writes are accepted; anything else is shown verbatim.
pub fn format_created_at(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        "New Conversation"
    } else {
        title
    }
}

pub fn summary_line(summary: &ConversationSummary) -> String {
    let noun = if summary.message_count == 1 {
        "message"
    } else {
        "messages"
    };
    format!(
        "  • {}  {}  ({} {noun}, {})",
        summary.id,
        display_title(&summary.title),
        summary.message_count,
        format_created_at(&summary.created_at)
    )
}

/// Plain-text rendering of a stored turn for `council show`.
pub fn message_lines(message: &ConversationMessage) -> Vec<String> {
    if message.role().is_user() {
        return vec![format!("You: {}", message.content)];
    }

    let mut lines = Vec::new();
    if let Some(stage1) = &message.stage1 {
        let models: Vec<&str> = stage1.iter().map(|r| short_model_name(&r.model)).collect();
        lines.push(format!("  Stage 1: {}", models.join(", ")));
    }
    if let Some(stage2) = &message.stage2 {
        lines.push(format!("  Stage 2: {} peer rankings", stage2.rankings.len()));
    }
    match (&message.stage3, &message.error) {
        (Some(stage3), _) => {
            lines.push(format!("Chairman ({}):", short_model_name(&stage3.model)));
            lines.extend(stage3.response.lines().map(|l| format!("  {l}")));
        }
        (None, Some(error)) => lines.push(format!("  ⚠ {error}")),
        (None, None) => lines.push("  (no final answer)".to_string()),
    }
    lines
}

pub async fn list_conversations(client: &CouncilClient) -> Result<(), Box<dyn Error>> {
    let conversations = client.list_conversations().await?;

    println!("🏛  Conversations on {}", client.base_url());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if conversations.is_empty() {
        println!("No conversations yet. Start one with 'council' or 'council new'.");
        return Ok(());
    }
    for summary in &conversations {
        println!("{}", summary_line(summary));
    }
    Ok(())
}

pub async fn new_conversation(client: &CouncilClient) -> Result<(), Box<dyn Error>> {
    let conversation = client.create_conversation().await?;
    println!("✅ Created conversation {}", conversation.id);
    Ok(())
}

pub async fn show_conversation(client: &CouncilClient, id: &str) -> Result<(), Box<dyn Error>> {
    let conversation = client.get_conversation(id).await?;
    println!("🏛  {}", display_title(&conversation.title));
    println!("   {}", format_created_at(&conversation.created_at));
    println!();
    for message in conversation.into_messages() {
        for line in message_lines(&message) {
            println!("{line}");
        }
        println!();
    }
    Ok(())
}

pub async fn delete_conversation(client: &CouncilClient, id: &str) -> Result<(), Box<dyn Error>> {
    client.delete_conversation(id).await?;
    println!("✅ Deleted conversation {id}");
    Ok(())
}
