//! Folding stream events into the assistant message of a council turn.
//!
//! [`reduce`] is a pure transition. Events that would break the stage order
//! or overwrite settled data are dropped and described as an [`Anomaly`]
//! instead, leaving logging to the caller.

use std::fmt;

use crate::core::event::StreamEvent;
use crate::core::message::{ConversationMessage, Stage, Stage2Result};

pub const DEFAULT_ERROR_MARKER: &str = "The council stream failed";

/// Why an event was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Data or start event for a stage whose predecessor is not settled.
    OutOfOrder { event: &'static str, stage: Stage },
    /// Event for a stage that already holds its data.
    Duplicate { event: &'static str, stage: Stage },
    Unknown,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::OutOfOrder { event, stage } => write!(
                f,
                "{event} arrived before stage {} settled",
                stage.previous().map(Stage::number).unwrap_or(0)
            ),
            Anomaly::Duplicate { event, stage } => {
                write!(f, "{event} arrived after stage {} completed", stage.number())
            }
            Anomaly::Unknown => write!(f, "unrecognised event type"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub message: ConversationMessage,
    pub anomaly: Option<Anomaly>,
}

impl Reduction {
    fn applied(message: ConversationMessage) -> Self {
        Self {
            message,
            anomaly: None,
        }
    }

    fn ignored(message: ConversationMessage, anomaly: Anomaly) -> Self {
        Self {
            message,
            anomaly: Some(anomaly),
        }
    }
}

/// A stage may start once its predecessor is complete or was never started.
fn may_start(message: &ConversationMessage, stage: Stage) -> bool {
    match stage.previous() {
        None => true,
        Some(previous) => !message.is_loading(previous),
    }
}

/// Stage data requires the predecessor's data to be present.
fn may_complete(message: &ConversationMessage, stage: Stage) -> bool {
    match stage.previous() {
        None => true,
        Some(previous) => message.is_complete(previous),
    }
}

fn start(mut message: ConversationMessage, event: &StreamEvent, stage: Stage) -> Reduction {
    let name = event.name();
    if message.is_complete(stage) {
        return Reduction::ignored(message, Anomaly::Duplicate { event: name, stage });
    }
    if !may_start(&message, stage) {
        return Reduction::ignored(message, Anomaly::OutOfOrder { event: name, stage });
    }
    message.set_loading(stage, true);
    Reduction::applied(message)
}

fn complete(
    mut message: ConversationMessage,
    event: &StreamEvent,
    stage: Stage,
    fill: impl FnOnce(&mut ConversationMessage),
) -> Reduction {
    let name = event.name();
    if message.is_complete(stage) {
        return Reduction::ignored(message, Anomaly::Duplicate { event: name, stage });
    }
    if !may_complete(&message, stage) {
        return Reduction::ignored(message, Anomaly::OutOfOrder { event: name, stage });
    }
    fill(&mut message);
    message.set_loading(stage, false);
    Reduction::applied(message)
}

pub fn reduce(message: ConversationMessage, event: &StreamEvent) -> Reduction {
    match event {
        StreamEvent::Stage1Start => start(message, event, Stage::One),
        StreamEvent::Stage2Start => start(message, event, Stage::Two),
        StreamEvent::Stage3Start => start(message, event, Stage::Three),
        StreamEvent::Stage1Data { data } => complete(message, event, Stage::One, |message| {
            message.stage1 = Some(data.clone());
        }),
        StreamEvent::Stage2Data { data, metadata } => {
            complete(message, event, Stage::Two, |message| {
                message.stage2 = Some(Stage2Result::new(data.clone(), metadata.clone()));
            })
        }
        StreamEvent::Stage3Data { data } => complete(message, event, Stage::Three, |message| {
            message.stage3 = Some(data.clone());
        }),
        StreamEvent::Done => {
            let mut message = message;
            message.loading.clear();
            Reduction::applied(message)
        }
        StreamEvent::Error { message: reason } => {
            let mut message = message;
            message.loading.clear();
            message.error = Some(
                reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or(DEFAULT_ERROR_MARKER)
                    .to_string(),
            );
            Reduction::applied(message)
        }
        // The title belongs to the conversation, not to this message.
        StreamEvent::TitleComplete { .. } => Reduction::applied(message),
        StreamEvent::Unknown => Reduction::ignored(message, Anomaly::Unknown),
    }
}

/// Folds a whole event sequence, discarding anomalies.
pub fn reduce_all<'a>(
    message: ConversationMessage,
    events: impl IntoIterator<Item = &'a StreamEvent>,
) -> ConversationMessage {
    events
        .into_iter()
        .fold(message, |message, event| reduce(message, event).message)
}
