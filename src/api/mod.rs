use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::message::{
    ConversationMessage, PeerRanking, Stage1Response, Stage2Metadata, Stage2Result,
    Stage3Result,
};

pub mod client;

pub use client::{ApiError, ByteStream, CouncilClient};

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// A message as the backend persists it. Stored assistant turns keep the
/// stage payloads but not the stage-2 metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum StoredMessage {
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        stage1: Option<Vec<Stage1Response>>,
        #[serde(default)]
        stage2: Option<Vec<PeerRanking>>,
        #[serde(default)]
        stage3: Option<Stage3Result>,
    },
}

impl From<StoredMessage> for ConversationMessage {
    fn from(stored: StoredMessage) -> Self {
        match stored {
            StoredMessage::User { content } => ConversationMessage::user(content),
            StoredMessage::Assistant {
                stage1,
                stage2,
                stage3,
            } => {
                let mut message = ConversationMessage::assistant();
                message.stage1 = stage1;
                message.stage2 =
                    stage2.map(|rankings| Stage2Result::new(rankings, Stage2Metadata::default()));
                message.stage3 = stage3;
                message
            }
        }
    }
}

impl Conversation {
    pub fn into_messages(self) -> Vec<ConversationMessage> {
        self.messages.into_iter().map(Into::into).collect()
    }
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub content: &'a str,
}

/// Aggregate answer of the non-streaming message endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CouncilResponse {
    #[serde(default)]
    pub stage1: Vec<Stage1Response>,
    #[serde(default)]
    pub stage2: Vec<PeerRanking>,
    pub stage3: Stage3Result,
    #[serde(default)]
    pub metadata: Stage2Metadata,
}

impl CouncilResponse {
    pub fn into_message(self) -> ConversationMessage {
        let mut message = ConversationMessage::assistant();
        message.stage1 = Some(self.stage1);
        message.stage2 = Some(Stage2Result::new(self.stage2, self.metadata));
        message.stage3 = Some(self.stage3);
        message
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub council_models: Vec<String>,
    pub chairman_model: String,
    #[serde(default)]
    pub is_custom: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetsResponse {
    pub presets: BTreeMap<String, Preset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavePresetRequest {
    pub name: String,
    pub description: String,
    pub council_models: Vec<String>,
    pub chairman_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavePresetResponse {
    #[serde(default)]
    pub success: bool,
    pub preset_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub council_models: Vec<String>,
    #[serde(default)]
    pub chairman_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

/// Custom presets are the only ones the backend lets us delete.
pub const CUSTOM_PRESET_PREFIX: &str = "custom_";

pub fn is_custom_preset_id(id: &str) -> bool {
    id.starts_with(CUSTOM_PRESET_PREFIX)
}
