//! Server-sent-event decoding for streaming chat completions.
//!
//! [`SseDecoder`] works on raw bytes so a multi-byte character split across
//! two network chunks is never mangled. Each dispatched event yields its
//! `data` payload; several `data:` lines of one event are joined with `\n`.

use crate::util::from_reqwest;
use lc_domain::error::Result;
use lc_domain::stream::{BoxStream, StreamEvent};

/// Incremental `text/event-stream` decoder.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    /// Bytes after the last complete line.
    pending: Vec<u8>,
    /// `data:` lines of the event being assembled.
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a network chunk; returns the payloads of every event it
    /// completed.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&*line);
            if let Some(payload) = self.line(line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush whatever the body ended with, for servers that omit the final
    /// blank line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw).into_owned();
            self.line(line.trim_end_matches('\r'));
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comments (`: keep-alive`) and the `event`, `id`, `retry` fields
        // carry nothing the chat parsers use.
        if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        } else if line == "data" {
            self.data.push(String::new());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = std::mem::take(&mut self.data).join("\n");
        (!payload.trim().is_empty()).then_some(payload)
    }
}

/// Turn a streaming `reqwest::Response` into [`StreamEvent`]s using a
/// provider-specific payload parser.
///
/// The parser keeps its own state across payloads (tool-call assembly).
/// When the body closes cleanly without the parser reporting `Done`, one
/// is synthesized; a transport error ends the stream with that error.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut decoder = SseDecoder::default();
        let mut done_emitted = false;

        loop {
            let payloads = match response.chunk().await {
                Ok(Some(bytes)) => decoder.feed(&bytes),
                Ok(None) => {
                    for event in decoder.finish().map(|p| parse_data(&p)).unwrap_or_default() {
                        done_emitted |= matches!(event, Ok(StreamEvent::Done { .. }));
                        yield event;
                    }
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "model stream interrupted");
                    yield Err(from_reqwest(e));
                    return;
                }
            };
            for payload in payloads {
                for event in parse_data(&payload) {
                    done_emitted |= matches!(event, Ok(StreamEvent::Done { .. }));
                    yield event;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_is_dispatched_on_blank_line() {
        let mut d = SseDecoder::default();
        assert!(d.feed(b"data: {\"a\":1}\n").is_empty());
        assert_eq!(d.feed(b"\n"), vec!["{\"a\":1}"]);
    }

    #[test]
    fn crlf_and_metadata_lines_are_handled() {
        let mut d = SseDecoder::default();
        let out = d.feed(b": keep-alive\r\nevent: chunk\r\nid: 7\r\ndata: payload\r\n\r\n");
        assert_eq!(out, vec!["payload"]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut d = SseDecoder::default();
        assert_eq!(d.feed(b"data: a\ndata: b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn split_utf8_character_survives_chunking() {
        let mut d = SseDecoder::default();
        let body = "data: caf\u{e9}\n\n".as_bytes();
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(d.feed(&body[..split]).is_empty());
        assert_eq!(d.feed(&body[split..]), vec!["caf\u{e9}"]);
    }

    #[test]
    fn blank_payloads_are_skipped() {
        let mut d = SseDecoder::default();
        assert!(d.feed(b"data: \n\n\n\n").is_empty());
    }

    #[test]
    fn finish_flushes_an_unterminated_event() {
        let mut d = SseDecoder::default();
        assert_eq!(d.feed(b"data: one\n\ndata: [DONE]"), vec!["one"]);
        assert_eq!(d.finish().as_deref(), Some("[DONE]"));
        assert_eq!(d.finish(), None);
    }
}
