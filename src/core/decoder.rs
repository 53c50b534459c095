//! Incremental decoding of the council event stream.
//!
//! The backend answers a streamed turn with newline-delimited `data: <json>`
//! lines. Transport chunks carry no relation to line boundaries, so the
//! decoder keeps the unterminated tail of each chunk and only parses lines
//! once their terminator has arrived. Lines are split on raw bytes before
//! UTF-8 decoding, which keeps multi-byte characters intact when a chunk
//! boundary falls inside one.

use std::borrow::Cow;
use std::collections::VecDeque;

use futures_util::{stream, Stream, StreamExt};
use memchr::memchr;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::event::StreamEvent;

/// One item produced by [`StreamDecoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedItem {
    Event(StreamEvent),
    /// A complete `data:` line whose payload could not be decoded. Decoding
    /// carries on with the next line.
    Malformed { payload: String, reason: String },
    /// The stream ended in the middle of a line; the partial line was dropped.
    Truncated { discarded_bytes: usize },
}

impl DecodedItem {
    pub fn into_event(self) -> Option<StreamEvent> {
        match self {
            DecodedItem::Event(event) => Some(event),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one transport chunk and returns the items for every line the
    /// chunk completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedItem> {
        self.buffer.extend_from_slice(chunk);

        let mut items = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[consumed..]) {
            let end = consumed + offset;
            if let Some(item) = decode_line(&self.buffer[consumed..end]) {
                items.push(item);
            }
            consumed = end + 1;
        }
        self.buffer.drain(..consumed);
        items
    }

    /// Ends decoding. Any unterminated carry-over is discarded and reported.
    pub fn finish(&mut self) -> Option<DecodedItem> {
        let leftover = std::mem::take(&mut self.buffer);
        if leftover.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        warn!(
            discarded_bytes = leftover.len(),
            "Event stream ended inside a line; dropping the partial event"
        );
        Some(DecodedItem::Truncated {
            discarded_bytes: leftover.len(),
        })
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

#[derive(Deserialize)]
struct EventKind<'a> {
    #[serde(rename = "type", borrow)]
    kind: Cow<'a, str>,
}

fn decode_line(raw: &[u8]) -> Option<DecodedItem> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(err) => {
            warn!(error = %err, "Invalid UTF-8 in event stream line");
            return Some(DecodedItem::Malformed {
                payload: String::from_utf8_lossy(raw).into_owned(),
                reason: err.to_string(),
            });
        }
    };

    // Blank separators, comments and non-data fields carry nothing for us.
    let payload = extract_data_payload(line)?;
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(DecodedItem::Event(StreamEvent::Done));
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(StreamEvent::Unknown) => {
            if let Ok(kind) = serde_json::from_str::<EventKind<'_>>(payload) {
                debug!(event_type = %kind.kind, "Unrecognised stream event type");
            }
            Some(DecodedItem::Event(StreamEvent::Unknown))
        }
        Ok(event) => Some(DecodedItem::Event(event)),
        Err(err) => {
            warn!(error = %err, payload = %payload, "Failed to parse stream event");
            Some(DecodedItem::Malformed {
                payload: payload.to_string(),
                reason: err.to_string(),
            })
        }
    }
}

struct DecodeState<S> {
    body: S,
    decoder: StreamDecoder,
    pending: VecDeque<DecodedItem>,
    exhausted: bool,
}

/// Lazily decodes a transport body into [`DecodedItem`]s.
///
/// A transport error is yielded once and ends the sequence; the carry-over
/// buffer is dropped with it.
pub fn decode_stream<S, B, E>(body: S) -> impl Stream<Item = Result<DecodedItem, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = DecodeState {
        body,
        decoder: StreamDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((Ok(item), state));
            }
            if state.exhausted {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let items = state.decoder.push(chunk.as_ref());
                    state.pending.extend(items);
                }
                Some(Err(err)) => {
                    state.exhausted = true;
                    if state.decoder.pending_len() > 0 {
                        debug!(
                            discarded_bytes = state.decoder.pending_len(),
                            "Dropping partial event after transport error"
                        );
                    }
                    return Some((Err(err), state));
                }
                None => {
                    state.exhausted = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{Stage1Response, Stage3Result};

    const TRANSCRIPT: &str = concat!(
        "data: {\"type\":\"stage1_start\"}\n\n",
        "data: {\"type\":\"stage1_complete\",\"data\":[{\"model\":\"a/b\",\"response\":\"héllo ✓\"}]}\r\n\r\n",
        ": keep-alive\n",
        "event: progress\n",
        "data:{\"type\":\"stage2_start\"}\n\n",
        "data: {\"type\":\"stage2_complete\",\"data\":[],\"metadata\":{\"label_to_model\":{},\"aggregate_rankings\":[]}}\n\n",
        "data: {\"type\":\"stage3_start\"}\n\n",
        "data: {\"type\":\"stage3_complete\",\"data\":{\"model\":\"c/d\",\"response\":\"y\"}}\n\n",
        "data: {\"type\":\"complete\"}\n\n",
    );

    fn events_for_chunks(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = StreamDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(
                decoder
                    .push(chunk)
                    .into_iter()
                    .filter_map(DecodedItem::into_event),
            );
        }
        events.extend(decoder.finish().and_then(DecodedItem::into_event));
        events
    }

    #[test]
    fn decodes_full_transcript_in_one_chunk() {
        let events = events_for_chunks(&[TRANSCRIPT.as_bytes()]);
        let names: Vec<_> = events.iter().map(StreamEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "stage1_start",
                "stage1_data",
                "stage2_start",
                "stage2_data",
                "stage3_start",
                "stage3_data",
                "done",
            ]
        );
        assert_eq!(
            events[1],
            StreamEvent::Stage1Data {
                data: vec![Stage1Response {
                    model: "a/b".into(),
                    response: "héllo ✓".into(),
                }],
            }
        );
        assert_eq!(
            events[5],
            StreamEvent::Stage3Data {
                data: Stage3Result {
                    model: "c/d".into(),
                    response: "y".into(),
                },
            }
        );
    }

    #[test]
    fn chunk_boundaries_never_change_output() {
        let bytes = TRANSCRIPT.as_bytes();
        let expected = events_for_chunks(&[bytes]);

        for split in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(split);
            assert_eq!(
                events_for_chunks(&[head, tail]),
                expected,
                "split at byte {split}"
            );
        }
    }

    #[test]
    fn three_way_chunkings_match() {
        let bytes = TRANSCRIPT.as_bytes();
        let expected = events_for_chunks(&[bytes]);

        for first in (0..bytes.len()).step_by(7) {
            for second in (first..=bytes.len()).step_by(5) {
                let chunks = [&bytes[..first], &bytes[first..second], &bytes[second..]];
                assert_eq!(events_for_chunks(&chunks), expected, "splits {first}/{second}");
            }
        }
    }

    #[test]
    fn byte_at_a_time_matches() {
        let bytes = TRANSCRIPT.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(events_for_chunks(&chunks), events_for_chunks(&[bytes]));
    }

    #[test]
    fn event_split_across_two_reads_is_emitted_once() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push(b"data: {\"typ").is_empty());
        let items = decoder.push(b"e\":\"stage1_start\"}\n");
        assert_eq!(items, vec![DecodedItem::Event(StreamEvent::Stage1Start)]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn malformed_line_is_reported_and_decoding_continues() {
        let mut decoder = StreamDecoder::new();
        let items = decoder.push(
            b"data: {\"type\":\"stage1_start\"}\ndata: {not json\ndata: {\"type\":\"done\"}\n",
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], DecodedItem::Event(StreamEvent::Stage1Start));
        match &items[1] {
            DecodedItem::Malformed { payload, .. } => assert_eq!(payload, "{not json"),
            other => panic!("expected malformed item, got {other:?}"),
        }
        assert_eq!(items[2], DecodedItem::Event(StreamEvent::Done));
    }

    #[test]
    fn invalid_utf8_is_malformed_not_fatal() {
        let mut decoder = StreamDecoder::new();
        let items = decoder.push(b"data: \xff\xfe\ndata: {\"type\":\"done\"}\n");
        assert!(matches!(items[0], DecodedItem::Malformed { .. }));
        assert_eq!(items[1], DecodedItem::Event(StreamEvent::Done));
    }

    #[test]
    fn missing_type_is_malformed() {
        let mut decoder = StreamDecoder::new();
        let items = decoder.push(b"data: {\"data\":[]}\n");
        assert!(matches!(items[0], DecodedItem::Malformed { .. }));
    }

    #[test]
    fn trailing_partial_line_is_reported_as_truncated() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(
            decoder.push(b"data: {\"type\":\"stage1_start\"}\ndata: {\"type\":\"sta"),
            vec![DecodedItem::Event(StreamEvent::Stage1Start)]
        );
        assert_eq!(
            decoder.finish(),
            Some(DecodedItem::Truncated {
                discarded_bytes: "data: {\"type\":\"sta".len(),
            })
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn trailing_whitespace_is_not_truncation() {
        let mut decoder = StreamDecoder::new();
        decoder.push(b"data: {\"type\":\"done\"}\n\r");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn openai_style_done_marker_maps_to_done() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(
            decoder.push(b"data: [DONE]\n"),
            vec![DecodedItem::Event(StreamEvent::Done)]
        );
    }

    #[tokio::test]
    async fn decode_stream_yields_lazily_and_reports_truncation() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"type\":\"stage1_".to_vec()),
            Ok(b"start\"}\n\ndata: {\"type\":\"done\"}\n".to_vec()),
            Ok(b"data: {\"ty".to_vec()),
        ];
        let items: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        assert_eq!(
            items,
            vec![
                Ok(DecodedItem::Event(StreamEvent::Stage1Start)),
                Ok(DecodedItem::Event(StreamEvent::Done)),
                Ok(DecodedItem::Truncated { discarded_bytes: 10 }),
            ]
        );
    }

    #[tokio::test]
    async fn decode_stream_ends_after_transport_error() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"type\":\"stage1_start\"}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: {\"type\":\"done\"}\n".to_vec()),
        ];
        let items: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        assert_eq!(
            items,
            vec![
                Ok(DecodedItem::Event(StreamEvent::Stage1Start)),
                Err("connection reset".to_string()),
            ]
        );
    }
}
