//! Single writer for the frames of one turn.
//!
//! Every typed emit builds a [`StreamPart`], sends a copy down the bounded
//! channel and hands the part back so the caller can apply it to its
//! [`ChatState`](lc_domain::chat_state::ChatState) only after the client
//! received it.
//!
//! Once the receiving side is gone the emitter latches: every later emit
//! fails fast with [`ClientGone`] without touching the channel.

use tokio::sync::mpsc;

use lc_domain::message::{Attachment, Citation, ConfirmRequest, Message, MessagePart};
use lc_domain::stream_part::StreamPart;
use lc_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frame
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One SSE record on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Part(StreamPart),
    /// A transport-level error, sent as a bare JSON string.
    RawError(String),
}

impl Frame {
    /// The `data:` payload of the record.
    pub fn data(&self) -> String {
        match self {
            Frame::Part(part) => serde_json::to_string(part).unwrap_or_default(),
            Frame::RawError(message) => serde_json::Value::String(message.clone()).to_string(),
        }
    }

    pub fn to_sse_record(&self) -> String {
        format!("data: {}\n\n", self.data())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Part(part) => part.kind(),
            Frame::RawError(_) => "error",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Emitter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The client stopped reading the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("client disconnected")]
pub struct ClientGone;

pub struct Emitter {
    tx: mpsc::Sender<Frame>,
    conversation_id: String,
    client_gone: bool,
}

impl Emitter {
    pub fn new(tx: mpsc::Sender<Frame>, conversation_id: impl Into<String>) -> Self {
        Self {
            tx,
            conversation_id: conversation_id.into(),
            client_gone: false,
        }
    }

    pub fn is_client_gone(&self) -> bool {
        self.client_gone
    }

    async fn send(&mut self, frame: Frame) -> Result<(), ClientGone> {
        if self.client_gone {
            return Err(ClientGone);
        }
        let kind = frame.kind();
        if self.tx.send(frame).await.is_err() {
            self.client_gone = true;
            tracing::warn!(
                conversation_id = %self.conversation_id,
                frame = kind,
                "client gone, dropping further frames"
            );
            TraceEvent::ClientGone {
                conversation_id: self.conversation_id.clone(),
                dropped_frame: kind.to_string(),
            }
            .emit();
            return Err(ClientGone);
        }
        Ok(())
    }

    /// Send `part` and return it for the caller to apply.
    pub async fn emit(&mut self, part: StreamPart) -> Result<StreamPart, ClientGone> {
        self.send(Frame::Part(part.clone())).await?;
        Ok(part)
    }

    pub async fn message(&mut self, message: Message) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Message { content: message }).await
    }

    pub async fn part(&mut self, part: MessagePart) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Part { part }).await
    }

    pub async fn text(&mut self, text: impl Into<String>) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Text { text: text.into() }).await
    }

    pub async fn reasoning(&mut self, reasoning: impl Into<String>) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Reasoning { reasoning: reasoning.into() }).await
    }

    pub async fn citations(&mut self, citations: Vec<Citation>) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Citations { citations }).await
    }

    pub async fn attachment(&mut self, attachment: Attachment) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Attachment { content: attachment }).await
    }

    pub async fn confirm_request(&mut self, request: ConfirmRequest) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::ConfirmRequest { content: request }).await
    }

    pub async fn summary(&mut self, summary: impl Into<String>) -> Result<StreamPart, ClientGone> {
        self.emit(StreamPart::Summary { content: summary.into() }).await
    }

    pub async fn raw_error(&mut self, message: impl Into<String>) -> Result<(), ClientGone> {
        self.send(Frame::RawError(message.into())).await
    }
}
