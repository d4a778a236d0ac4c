//! Progress events and the sinks that receive them.
//!
//! The pipeline reports through a [`ProgressEmitter`]. The server forwards
//! events to an SSE stream via [`ChannelEmitter`]; automated runs and tests
//! that don't care use [`SilentEmitter`].

use async_trait::async_trait;
use deepcut_shared::{IdeaId, ResearchPackage, SectionKey, SectionPayload};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// One progress notification.
///
/// Serialized with a `status` tag, e.g.
/// `{"status":"generating","section":"viralConcept","label":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    Generating {
        section: SectionKey,
        label: String,
    },
    Complete {
        section: SectionKey,
        data: SectionPayload,
    },
    Done {
        id: IdeaId,
        #[serde(rename = "researchData")]
        research_data: ResearchPackage,
    },
    Error {
        error: String,
    },
}

impl ProgressEvent {
    /// `done` and `error` end a run; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Sink for progress events.
#[async_trait]
pub trait ProgressEmitter: Send + Sync {
    /// Deliver one event. Must not block; delivery failures are swallowed.
    fn emit(&self, event: ProgressEvent);

    /// Whether the consumer has gone away.
    fn is_closed(&self) -> bool {
        false
    }

    /// Resolves once the consumer has gone away. Never resolves by default.
    async fn cancelled(&self) {
        std::future::pending::<()>().await
    }
}

/// Discards every event.
pub struct SilentEmitter;

impl ProgressEmitter for SilentEmitter {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events over an unbounded channel.
///
/// The stream consumer owns the receiver. Dropping the receiver marks the
/// emitter closed; dropping the emitter ends the consumer's stream.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressEmitter for ChannelEmitter {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("progress receiver dropped, event discarded");
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn cancelled(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_generating() {
        let event = ProgressEvent::Generating {
            section: SectionKey::ViralConcept,
            label: "Crafting viral concept & angle...".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "status": "generating",
                "section": "viralConcept",
                "label": "Crafting viral concept & angle..."
            })
        );
    }

    #[test]
    fn wire_format_complete_with_fallback() {
        let event = ProgressEvent::Complete {
            section: SectionKey::FoiaSuggestions,
            data: SectionPayload::fallback("oops"),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "status": "complete", "section": "foiaSuggestions", "data": { "raw": "oops" } })
        );
    }

    #[test]
    fn wire_format_error() {
        let event = ProgressEvent::Error {
            error: "HTTP 429".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "status": "error", "error": "HTTP 429" })
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn round_trips_through_json() {
        let event = ProgressEvent::Generating {
            section: SectionKey::StoryStructure,
            label: "x".into(),
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: ProgressEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
        assert!(!back.is_terminal());
    }

    #[tokio::test]
    async fn channel_emitter_forwards_and_detects_close() {
        let (emitter, mut rx) = ChannelEmitter::channel();
        emitter.emit(ProgressEvent::Error { error: "e".into() });
        assert!(matches!(rx.recv().await, Some(ProgressEvent::Error { .. })));
        assert!(!emitter.is_closed());

        drop(rx);
        assert!(emitter.is_closed());
        // Resolves immediately once closed; emitting afterwards is harmless.
        emitter.cancelled().await;
        emitter.emit(ProgressEvent::Error { error: "late".into() });
    }

    #[tokio::test]
    async fn stream_ends_when_emitter_dropped() {
        let (emitter, mut rx) = ChannelEmitter::channel();
        emitter.emit(ProgressEvent::Error { error: "e".into() });
        drop(emitter);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
