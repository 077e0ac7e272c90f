//! Notifications emitted by the processor.

use dichroma_core::FrameGeometry;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::source::LutLocator;

/// Lifecycle and LUT-switch notifications for the UI shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorEvent {
    /// A build for `locator` has started.
    LutLoading { locator: LutLocator },
    /// A table is now active. `locator` is `None` for the identity table.
    LutLoaded {
        name: String,
        locator: Option<LutLocator>,
    },
    /// The latest requested table failed to load; the previous one stays.
    LutFailed { locator: LutLocator, message: String },
    CaptureStarted { geometry: FrameGeometry },
    CaptureFailed { message: String },
    Paused,
    Stopped,
}

/// Fan-out channel for [`ProcessorEvent`]s.
///
/// Emitting never blocks. Subscribers that fall behind by more than the
/// channel capacity miss the oldest events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ProcessorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessorEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ProcessorEvent) {
        tracing::trace!("processor event: {event:?}");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ProcessorEvent::LutLoading {
            locator: LutLocator::new("Protanopia", "LUTs/protanopia.lut.png"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "lut_loading");
        assert_eq!(json["locator"]["name"], "Protanopia");

        let json = serde_json::to_value(ProcessorEvent::Paused).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "paused" }));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit(ProcessorEvent::Stopped);

        let mut rx = bus.subscribe();
        bus.emit(ProcessorEvent::Paused);
        assert_eq!(rx.try_recv().unwrap(), ProcessorEvent::Paused);
    }
}
