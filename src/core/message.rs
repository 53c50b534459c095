use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

/// One council member's individual answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Response {
    pub model: String,
    pub response: String,
}

/// A council member's evaluation of the anonymised stage-1 answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRanking {
    pub model: String,
    pub ranking: String,
    #[serde(default)]
    pub parsed_ranking: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub model: String,
    pub average_rank: f64,
    pub rankings_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage2Metadata {
    #[serde(default)]
    pub label_to_model: BTreeMap<String, String>,
    #[serde(default)]
    pub aggregate_rankings: Vec<AggregateRanking>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage2Result {
    pub rankings: Vec<PeerRanking>,
    /// Maps an anonymised label such as `Response A` to the real model id.
    pub label_to_model: BTreeMap<String, String>,
    pub aggregate_rankings: Vec<AggregateRanking>,
}

impl Stage2Result {
    pub fn new(rankings: Vec<PeerRanking>, metadata: Stage2Metadata) -> Self {
        Self {
            rankings,
            label_to_model: metadata.label_to_model,
            aggregate_rankings: metadata.aggregate_rankings,
        }
    }

    /// Replaces anonymised labels in `text` with the model they stand for.
    pub fn deanonymize(&self, text: &str) -> String {
        // An empty label matches everywhere and would never advance.
        let mut labels: Vec<_> = self
            .label_to_model
            .iter()
            .filter(|(label, _)| !label.is_empty())
            .collect();
        // Longest label wins when several match at the same position.
        labels.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            match labels.iter().find(|(label, _)| rest.starts_with(label.as_str())) {
                Some((label, model)) => {
                    out.push_str(label);
                    out.push_str(" (");
                    out.push_str(model);
                    out.push(')');
                    rest = &rest[label.len()..];
                }
                None => {
                    out.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }
        out
    }
}

/// The chairman's synthesised final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Result {
    pub model: String,
    pub response: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageLoading {
    pub stage1: bool,
    pub stage2: bool,
    pub stage3: bool,
}

impl StageLoading {
    pub fn any(&self) -> bool {
        self.stage1 || self.stage2 || self.stage3
    }

    pub fn clear(&mut self) {
        *self = StageLoading::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    One,
    Two,
    Three,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::One, Stage::Two, Stage::Three];

    pub fn number(self) -> u8 {
        match self {
            Stage::One => 1,
            Stage::Two => 2,
            Stage::Three => 3,
        }
    }

    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::One => None,
            Stage::Two => Some(Stage::One),
            Stage::Three => Some(Stage::Two),
        }
    }

    /// Anchor id for this stage's block in the message at `index`.
    pub fn section_id(self, index: usize) -> String {
        format!("stage{}-{index}", self.number())
    }
}

/// Where a stage stands within one assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    NotStarted,
    InFlight,
    Complete,
}

/// One turn of a council conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    role: Role,
    pub content: String,
    pub stage1: Option<Vec<Stage1Response>>,
    pub stage2: Option<Stage2Result>,
    pub stage3: Option<Stage3Result>,
    pub loading: StageLoading,
    /// Set when the turn failed; stage data collected so far is kept.
    pub error: Option<String>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            stage1: None,
            stage2: None,
            stage3: None,
            loading: StageLoading::default(),
            error: None,
        }
    }

    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            stage1: None,
            stage2: None,
            stage3: None,
            loading: StageLoading::default(),
            error: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        match stage {
            Stage::One => self.stage1.is_some(),
            Stage::Two => self.stage2.is_some(),
            Stage::Three => self.stage3.is_some(),
        }
    }

    pub fn is_loading(&self, stage: Stage) -> bool {
        match stage {
            Stage::One => self.loading.stage1,
            Stage::Two => self.loading.stage2,
            Stage::Three => self.loading.stage3,
        }
    }

    pub fn set_loading(&mut self, stage: Stage, value: bool) {
        match stage {
            Stage::One => self.loading.stage1 = value,
            Stage::Two => self.loading.stage2 = value,
            Stage::Three => self.loading.stage3 = value,
        }
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        if self.is_complete(stage) {
            StageStatus::Complete
        } else if self.is_loading(stage) {
            StageStatus::InFlight
        } else {
            StageStatus::NotStarted
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
