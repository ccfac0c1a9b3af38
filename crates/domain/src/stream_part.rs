use serde::{Deserialize, Serialize};

use crate::message::{Attachment, Citation, ConfirmRequest, Message, MessagePart};

/// One frame of the engine → client wire protocol.
///
/// Structural events (`response`, `part`) carry whole values; `text` and
/// `reasoning` carry deltas that extend the last part in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamPart {
    /// A new message shell. Applied as "push message".
    #[serde(rename = "response")]
    Message { content: Message },

    #[serde(rename = "part")]
    Part { part: MessagePart },

    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "reasoning")]
    Reasoning { reasoning: String },

    #[serde(rename = "citations")]
    Citations { citations: Vec<Citation> },

    #[serde(rename = "attachment")]
    Attachment { content: Attachment },

    #[serde(rename = "confirmRequest")]
    ConfirmRequest { content: ConfirmRequest },

    #[serde(rename = "summary")]
    Summary { content: String },
}

impl StreamPart {
    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamPart::Message { .. } => "response",
            StreamPart::Part { .. } => "part",
            StreamPart::Text { .. } => "text",
            StreamPart::Reasoning { .. } => "reasoning",
            StreamPart::Citations { .. } => "citations",
            StreamPart::Attachment { .. } => "attachment",
            StreamPart::ConfirmRequest { .. } => "confirmRequest",
            StreamPart::Summary { .. } => "summary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_shape() {
        let json = serde_json::to_value(StreamPart::Text { text: "hi".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn confirm_request_frame_shape() {
        let part = StreamPart::ConfirmRequest {
            content: ConfirmRequest {
                tool_call_id: "t1".into(),
                tool_name: "rm".into(),
                tool_args: serde_json::json!({"path": "a"}),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "confirmRequest");
        assert_eq!(json["content"]["toolName"], "rm");
        assert_eq!(json["content"]["toolArgs"]["path"], "a");
        assert_eq!(part.kind(), "confirmRequest");
    }

    #[test]
    fn part_frame_nests_typed_fragment() {
        let json = serde_json::to_value(StreamPart::Part {
            part: MessagePart::error("boom"),
        })
        .unwrap();
        assert_eq!(json["type"], "part");
        assert_eq!(json["part"]["type"], "error");
        assert_eq!(json["part"]["error"], "boom");
    }
}
