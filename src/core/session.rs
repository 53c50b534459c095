use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiError, ByteStream, CouncilClient, CouncilResponse};
use crate::core::decoder::{decode_stream, DecodedItem};
use crate::core::event::StreamEvent;
use crate::core::message::ConversationMessage;
use crate::core::reducer::{reduce, Reduction};

pub const CANCELLED_MARKER: &str = "Request cancelled";
pub const CLOSED_EARLY_MARKER: &str = "The council stream closed before the answer was complete";

/// Where a session gets its bytes from.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn open_stream(&self, conversation_id: &str, content: &str)
        -> Result<ByteStream, ApiError>;

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<CouncilResponse, ApiError>;
}

#[async_trait]
impl EventTransport for CouncilClient {
    async fn open_stream(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<ByteStream, ApiError> {
        self.open_message_stream(conversation_id, content).await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<CouncilResponse, ApiError> {
        CouncilClient::send_message(self, conversation_id, content).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    pub message: ConversationMessage,
    /// Conversation title generated by the backend during this turn.
    pub title: Option<String>,
}

/// Fold a terminal failure into the message, keeping collected stages.
fn fail(message: ConversationMessage, reason: impl Into<String>) -> ConversationMessage {
    reduce(
        message,
        &StreamEvent::Error {
            message: Some(reason.into()),
        },
    )
    .message
}

/// One streamed council turn.
pub struct StreamSession<'a> {
    transport: &'a dyn EventTransport,
    cancel_token: CancellationToken,
}

impl<'a> StreamSession<'a> {
    pub fn new(transport: &'a dyn EventTransport) -> Self {
        Self {
            transport,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Streams one turn, calling `on_update` with the assistant message after
    /// every event before the next one is read.
    pub async fn run<F>(&self, conversation_id: &str, content: &str, mut on_update: F) -> StreamOutcome
    where
        F: FnMut(&ConversationMessage),
    {
        let mut message = ConversationMessage::assistant();
        let mut title = None;

        debug!(conversation_id, "Starting council stream");
        let opened = tokio::select! {
            opened = self.transport.open_stream(conversation_id, content) => opened,
            _ = self.cancel_token.cancelled() => Err(ApiError::Transport(CANCELLED_MARKER.into())),
        };
        let body = match opened {
            Ok(body) => body,
            Err(err) => {
                warn!(conversation_id, error = %err, "Council stream failed to open");
                message = fail(message, err.to_string());
                on_update(&message);
                return StreamOutcome { message, title };
            }
        };

        let mut items = std::pin::pin!(decode_stream(body));
        let mut terminated = false;
        loop {
            let next = tokio::select! {
                next = items.next() => next,
                _ = self.cancel_token.cancelled() => {
                    debug!(conversation_id, "Council stream cancelled");
                    message = fail(message, CANCELLED_MARKER);
                    on_update(&message);
                    return StreamOutcome { message, title };
                }
            };

            match next {
                None => break,
                Some(Ok(DecodedItem::Event(event))) => {
                    if let StreamEvent::TitleComplete { data } = &event {
                        title = Some(data.title.clone());
                    }
                    if terminated {
                        // The turn is settled; later events must not re-arm stages.
                        if !matches!(event, StreamEvent::TitleComplete { .. }) {
                            warn!(conversation_id, event = event.name(), "Ignoring event after the turn finished");
                        }
                        continue;
                    }
                    terminated = event.is_terminal();
                    let Reduction {
                        message: next_message,
                        anomaly,
                    } = reduce(message, &event);
                    message = next_message;
                    if let Some(anomaly) = anomaly {
                        warn!(conversation_id, event = event.name(), %anomaly, "Ignoring stream event");
                    }
                    on_update(&message);
                }
                // Already logged by the decoder; the stream carries on.
                Some(Ok(DecodedItem::Malformed { .. })) | Some(Ok(DecodedItem::Truncated { .. })) => {}
                Some(Err(err)) => {
                    if terminated {
                        debug!(conversation_id, error = %err, "Transport error after the turn finished");
                        break;
                    }
                    warn!(conversation_id, error = %err, "Council stream aborted");
                    message = fail(message, err.to_string());
                    on_update(&message);
                    return StreamOutcome { message, title };
                }
            }
        }

        if !terminated {
            warn!(conversation_id, "Council stream closed without a final event");
            message = fail(message, CLOSED_EARLY_MARKER);
            on_update(&message);
        }
        debug!(conversation_id, "Council stream finished");
        StreamOutcome { message, title }
    }

    /// Fallback without intermediate progress: one request, one update.
    pub async fn run_without_streaming<F>(
        &self,
        conversation_id: &str,
        content: &str,
        mut on_update: F,
    ) -> StreamOutcome
    where
        F: FnMut(&ConversationMessage),
    {
        let mut message = ConversationMessage::assistant();
        message.loading.stage1 = true;
        on_update(&message);

        let result = tokio::select! {
            result = self.transport.send_message(conversation_id, content) => result,
            _ = self.cancel_token.cancelled() => Err(ApiError::Transport(CANCELLED_MARKER.into())),
        };
        message = match result {
            Ok(response) => response.into_message(),
            Err(err) => {
                warn!(conversation_id, error = %err, "Council request failed");
                fail(message, err.to_string())
            }
        };
        on_update(&message);
        StreamOutcome {
            message,
            title: None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum SessionUpdate {
    Snapshot(ConversationMessage),
    Title(String),
    End,
}

pub struct StreamParams {
    pub transport: Arc<dyn EventTransport>,
    pub conversation_id: String,
    pub content: String,
    pub streaming: bool,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Runs sessions on the runtime and forwards their updates, tagged with the
/// stream id so stale streams can be told apart.
#[derive(Clone)]
pub struct StreamService {
    tx: mpsc::UnboundedSender<(SessionUpdate, u64)>,
}

impl StreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SessionUpdate, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                transport,
                conversation_id,
                content,
                streaming,
                cancel_token,
                stream_id,
            } = params;

            let session = StreamSession::new(transport.as_ref()).with_cancellation(cancel_token);
            let publish = |message: &ConversationMessage| {
                let _ = tx.send((SessionUpdate::Snapshot(message.clone()), stream_id));
            };
            let outcome = if streaming {
                session.run(&conversation_id, &content, publish).await
            } else {
                session
                    .run_without_streaming(&conversation_id, &content, publish)
                    .await
            };

            if let Some(title) = outcome.title {
                let _ = tx.send((SessionUpdate::Title(title), stream_id));
            }
            let _ = tx.send((SessionUpdate::End, stream_id));
        });
    }
}
