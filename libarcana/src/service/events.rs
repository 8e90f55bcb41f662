//! Event system for state-change notification
//!
//! The orchestrator never renders anything. Renderers subscribe to this bus
//! and redraw when an event arrives.
//!
//! # Non-Blocking Behavior
//!
//! If no subscribers exist, events are dropped immediately. Subscribers can
//! lag without blocking emitters; a lagging subscriber misses the oldest
//! events first.
//!
//! # Example
//!
//! ```
//! use libarcana::service::events::{Event, EventBus, Flow};
//!
//! # async fn example() {
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(Event::FlowStarted { flow: Flow::Reading });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::navigation::Page;
use super::notifications::Severity;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Broadcast bus shared by the orchestrator and its notification queue
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers (non-blocking)
    pub fn emit(&self, event: Event) {
        // send() fails only when nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// User-triggered flows that talk to the reading service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Startup,
    Reading,
    Purchase,
    QuizSubmit,
}

/// State changes emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Catalogs are in place and the UI may leave its loading state
    CatalogLoaded { readers: usize, cards: usize },

    /// Startup failed; the UI must show an explicit error state
    CatalogFailed { error: String },

    PageChanged { from: Page, to: Page },

    /// Profile mutated (and a write-through was attempted)
    ProfileUpdated {
        balance: u64,
        level: u32,
        experience: u64,
    },

    SelectionChanged {
        reader: Option<String>,
        reading_type: Option<String>,
    },

    QuizAnswered {
        question_id: u32,
        option: usize,
        answered: usize,
        total: usize,
    },

    NotificationPushed {
        id: u64,
        message: String,
        severity: Severity,
    },

    NotificationRemoved { id: u64 },

    /// A flow went in flight; triggers for it should be disabled
    FlowStarted { flow: Flow },

    FlowFinished { flow: Flow, success: bool },
}
