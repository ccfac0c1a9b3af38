use parking_lot::Mutex;

use lc_domain::message::Attachment;

/// Something a tool surfaced to the user while running.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolUiEvent {
    Debug {
        display_message: String,
        data: Vec<serde_json::Value>,
    },
    Attachment(Attachment),
}

/// Collects user-visible output of one tool call.
///
/// The orchestrator drains it after `invoke` returns and turns the
/// entries into parts of the tool message.
#[derive(Debug, Default)]
pub struct ToolUiLink {
    events: Mutex<Vec<ToolUiEvent>>,
}

impl ToolUiLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&self, display_message: impl Into<String>, data: Vec<serde_json::Value>) {
        self.events.lock().push(ToolUiEvent::Debug {
            display_message: display_message.into(),
            data,
        });
    }

    pub fn attachment(&self, attachment: Attachment) {
        self.events.lock().push(ToolUiEvent::Attachment(attachment));
    }

    pub fn drain(&self) -> Vec<ToolUiEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_order_and_empties() {
        let link = ToolUiLink::new();
        link.debug("step 1", vec![]);
        link.attachment(Attachment {
            id: "f".into(),
            mimetype: "image/png".into(),
            name: "a.png".into(),
            size: 1,
        });
        let events = link.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ToolUiEvent::Debug { display_message, .. } if display_message == "step 1"));
        assert!(matches!(&events[1], ToolUiEvent::Attachment(a) if a.id == "f"));
        assert!(link.drain().is_empty());
    }
}
