//! `text/event-stream` decoding.
//!
//! Chunks may split lines (and UTF-8 sequences) anywhere, so bytes are
//! buffered until a full line is available. Events are dispatched on a blank
//! line, and a trailing event without one is flushed when the body ends.

use crate::{ByteStream, HttpError};
use futures::{Stream, StreamExt};

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// Value of the last `event:` field, if any.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

#[derive(Default)]
struct Pending {
    event: Option<String>,
    data: Vec<String>,
}

impl Pending {
    fn feed(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let taken = std::mem::take(self);
        Some(SseEvent {
            event: taken.event,
            data: taken.data.join("\n"),
        })
    }
}

/// Decode a response body into server-sent events, lazily.
pub fn events(body: ByteStream) -> impl Stream<Item = Result<SseEvent, HttpError>> + Send {
    async_stream::try_stream! {
        let mut body = body;
        let mut buf: Vec<u8> = Vec::new();
        let mut pending = Pending::default();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buf.extend_from_slice(&chunk);
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                if let Some(event) = pending.feed(line.trim_end_matches(['\n', '\r'])) {
                    yield event;
                }
            }
        }

        if !buf.is_empty() {
            let line = String::from_utf8_lossy(&buf).into_owned();
            if let Some(event) = pending.feed(line.trim_end_matches('\r')) {
                yield event;
            }
        }
        if let Some(event) = pending.dispatch() {
            yield event;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::TryStreamExt;

    fn body(chunks: &[&'static [u8]]) -> ByteStream {
        let items: Vec<Result<Bytes, HttpError>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn splits_events_across_chunk_boundaries() {
        let stream = events(body(&[
            b"event: content_block_delta\nda",
            b"ta: {\"a\":1}\n\n: keep-alive\n\ndata: [DONE]\n\n",
        ]));
        let got: Vec<SseEvent> = stream.try_collect().await.unwrap();
        assert_eq!(
            got,
            vec![
                SseEvent {
                    event: Some("content_block_delta".into()),
                    data: "{\"a\":1}".into(),
                },
                SseEvent {
                    event: None,
                    data: "[DONE]".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn keeps_multibyte_text_split_between_chunks() {
        let text = "data: café\r\n\r\n".as_bytes();
        let (head, tail) = text.split_at(10); // inside the 'é'
        let head: &'static [u8] = Box::leak(head.to_vec().into_boxed_slice());
        let tail: &'static [u8] = Box::leak(tail.to_vec().into_boxed_slice());
        let got: Vec<SseEvent> = events(body(&[head, tail])).try_collect().await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].data, "café");
    }

    #[tokio::test]
    async fn flushes_trailing_event_without_blank_line() {
        let got: Vec<SseEvent> = events(body(&[b"data: one\ndata: two"]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].data, "one\ntwo");
    }

    #[tokio::test]
    async fn body_errors_surface() {
        let items: Vec<Result<Bytes, HttpError>> = vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Err(HttpError::Network("reset".into())),
        ];
        let mut stream = Box::pin(events(Box::pin(futures::stream::iter(items))));
        assert_eq!(stream.next().await.unwrap().unwrap().data, "a");
        assert!(stream.next().await.unwrap().is_err());
    }
}
