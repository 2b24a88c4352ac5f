use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// State changes published while working on sessions.
///
/// Subscribers (a renderer, a progress display) register independently of the
/// component that emits; persistence is sequenced by the emitter itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionCreated {
        session_id: String,
    },
    SessionSwitched {
        session_id: String,
    },
    SessionRenamed {
        session_id: String,
        name: String,
    },
    SessionDeleted {
        session_id: String,
    },
    /// Page content or the page cursor changed.
    PageChanged {
        session_id: String,
        page_index: usize,
    },
    GenerationStarted {
        session_id: String,
        page_index: usize,
    },
    /// A new artifact version became current for a page.
    ArtifactAdded {
        session_id: String,
        page_index: usize,
        version_number: u32,
    },
    GenerationFailed {
        session_id: String,
        page_index: usize,
        message: String,
    },
    /// A batch stopped, whether it finished, failed or was cancelled.
    BatchFinished {
        session_id: String,
        generated: usize,
        total: usize,
    },
    /// State was written to storage.
    Persisted,
}

const EVENT_CAPACITY: usize = 256;

/// Fan-out channel for [`SessionEvent`]s.
///
/// Emitting never fails: events sent with no live subscriber are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!(?event, "Emitting session event");
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(SessionEvent::PageChanged {
            session_id: "s".into(),
            page_index: 0,
        });
        bus.emit(SessionEvent::Persisted);

        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::PageChanged { page_index: 0, .. }
        ));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Persisted);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        EventBus::new().emit(SessionEvent::Persisted);
    }

    #[test]
    fn test_event_wire_tag() {
        let json = serde_json::to_value(SessionEvent::SessionDeleted {
            session_id: "s".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "session_deleted");
    }
}
