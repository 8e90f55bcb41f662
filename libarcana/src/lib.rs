//! Arcana - client core for an AI tarot reading service
//!
//! This library holds the application state orchestrator behind the Arcana
//! front ends: catalog loading, reading/quiz/purchase flows, the persisted
//! user progression record, page navigation and the notification queue.
//! Rendering is left to the consumers, which observe state through the
//! event bus exposed by [`service::ArcanaService`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod profile;
pub mod rewards;
pub mod service;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ArcanaError, Result};
pub use gateway::{Gateway, HttpGateway};
pub use profile::UserProfile;
pub use service::ArcanaService;
pub use storage::{JsonFileStore, MemoryStore, ProfileStore};
pub use types::{Catalog, Reading, TarotCard};
