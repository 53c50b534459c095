use serde::Deserialize;

use crate::core::message::{PeerRanking, Stage1Response, Stage2Metadata, Stage3Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TitleData {
    pub title: String,
}

/// One progress event of a streamed council turn, as carried by a
/// `data: <json>` line.
///
/// The backend names stage payload events `stageN_complete` and the final
/// event `complete`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Stage1Start,
    #[serde(alias = "stage1_complete")]
    Stage1Data { data: Vec<Stage1Response> },
    Stage2Start,
    #[serde(alias = "stage2_complete")]
    Stage2Data {
        data: Vec<PeerRanking>,
        #[serde(default)]
        metadata: Stage2Metadata,
    },
    Stage3Start,
    #[serde(alias = "stage3_complete")]
    Stage3Data { data: Stage3Result },
    TitleComplete { data: TitleData },
    #[serde(alias = "complete")]
    Done,
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Stage1Start => "stage1_start",
            StreamEvent::Stage1Data { .. } => "stage1_data",
            StreamEvent::Stage2Start => "stage2_start",
            StreamEvent::Stage2Data { .. } => "stage2_data",
            StreamEvent::Stage3Start => "stage3_start",
            StreamEvent::Stage3Data { .. } => "stage3_data",
            StreamEvent::TitleComplete { .. } => "title_complete",
            StreamEvent::Done => "done",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Unknown => "unknown",
        }
    }

    /// `done` and `error` end a turn; nothing after them is expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}
