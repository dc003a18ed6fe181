//! Tracking event system.
//!
//! The [`TrackingController`](crate::TrackingController) reports every
//! lifecycle transition and every sample outcome as a [`TrackingEvent`].
//! Displays and loggers subscribe; sending never blocks or fails when nobody
//! listens.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use waypost_types::{LocationRecord, OperatorId};

/// Events emitted by a tracking session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum TrackingEvent {
    /// The first fix succeeded and the repeating cycle began.
    Started { operator: OperatorId },
    /// A sample was appended to the store.
    SampleSaved { record: LocationRecord },
    /// Appending a sample failed; the sample is dropped.
    SaveFailed { error: String },
    /// A positioning request failed.
    AcquisitionFailed { error: String, policy_denied: bool },
    /// The session ended.
    Stopped,
}

/// Sender for tracking events.
pub type EventSender = broadcast::Sender<TrackingEvent>;

/// Receiver for tracking events.
pub type EventReceiver = broadcast::Receiver<TrackingEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: TrackingEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
