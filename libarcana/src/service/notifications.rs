//! Self-expiring notification queue
//!
//! Every push gets a counter-based id and a tokio timer task that removes it
//! once the time-to-live has elapsed. Manual dismissal aborts that task, and
//! dropping the queue aborts all of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::events::{Event, EventBus};

/// Default time a notification stays visible
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    entries: VecDeque<Notification>,
    timers: HashMap<u64, JoinHandle<()>>,
}

impl QueueState {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }
}

pub struct NotificationQueue {
    state: Arc<Mutex<QueueState>>,
    ttl: Duration,
    events: EventBus,
}

impl NotificationQueue {
    pub fn new(ttl: Duration, events: EventBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                next_id: 1,
                ..Default::default()
            })),
            ttl,
            events,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Append a notification and schedule its removal; returns its id
    ///
    /// Outside a tokio runtime the entry is kept until dismissed.
    pub fn push(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let message = message.into();
        let mut state = lock(&self.state);

        let id = state.next_id;
        state.next_id += 1;
        state.entries.push_back(Notification {
            id,
            message: message.clone(),
            severity,
            created_at: Utc::now(),
        });

        match Handle::try_current() {
            Ok(handle) => {
                let timer = handle.spawn(expire(
                    Arc::downgrade(&self.state),
                    self.events.clone(),
                    id,
                    self.ttl,
                ));
                state.timers.insert(id, timer);
            }
            Err(_) => {
                tracing::warn!(id, "No async runtime; notification will not expire on its own");
            }
        }
        drop(state);

        tracing::debug!(id, %severity, "Notification pushed: {}", message);
        self.events.emit(Event::NotificationPushed {
            id,
            message,
            severity,
        });
        id
    }

    /// Remove a notification now and cancel its timer
    ///
    /// Returns false if it was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timers.remove(&id) {
            timer.abort();
        }
        let removed = state.remove(id);
        drop(state);

        if removed {
            self.events.emit(Event::NotificationRemoved { id });
        }
        removed
    }

    /// Current notifications, oldest first
    pub fn snapshot(&self) -> Vec<Notification> {
        lock(&self.state).entries.iter().cloned().collect()
    }

    pub fn contains(&self, id: u64) -> bool {
        lock(&self.state).entries.iter().any(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        for (_, timer) in lock(&self.state).timers.drain() {
            timer.abort();
        }
    }
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn expire(state: Weak<Mutex<QueueState>>, events: EventBus, id: u64, ttl: Duration) {
    tokio::time::sleep(ttl).await;

    let Some(state) = state.upgrade() else {
        return;
    };
    let removed = {
        let mut state = lock(&state);
        state.timers.remove(&id);
        state.remove(id)
    };

    if removed {
        tracing::debug!(id, "Notification expired");
        events.emit(Event::NotificationRemoved { id });
    }
}
