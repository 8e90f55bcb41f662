//! Remote service gateway
//!
//! Typed request/response contracts for every operation of the reading
//! service. Gateways own no state and never retry: a failed call surfaces
//! once and the orchestrator decides what to tell the user.
//!
//! # Examples
//!
//! ```no_run
//! use libarcana::config::Config;
//! use libarcana::gateway::{fetch_catalogs, HttpGateway};
//!
//! # async fn example() -> libarcana::Result<()> {
//! let gateway = HttpGateway::new(&Config::default_config())?;
//! let catalog = fetch_catalogs(&gateway).await?;
//! println!("{} readers, {} cards", catalog.readers.len(), catalog.cards.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{
    CardDeck, Catalog, CoinPackage, QuizQuestion, Quote, Reader, Reading, ReadingType,
};

pub mod http;

// Mock gateway is available for all builds (not just tests) to support integration tests
pub mod mock;

pub use http::HttpGateway;
pub use mock::MockGateway;

/// Body of a perform-reading request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRequest {
    pub reader_id: String,
    pub reading_type: String,
    pub question: String,
    pub user_id: String,
}

/// Body of a purchase request; the user travels in the path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub package_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub new_balance: u64,
    pub coins_added: u64,
}

/// One graded answer as sent to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswer {
    #[serde(rename = "questionId")]
    pub question_id: u32,
    pub answer: usize,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub answers: Vec<QuizAnswer>,
    pub user_id: String,
}

/// Authoritative quiz score from the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub coins_earned: u64,
    pub new_balance: u64,
}

/// Reading service operations
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_readers(&self) -> Result<Vec<Reader>>;

    async fn fetch_cards(&self) -> Result<CardDeck>;

    async fn fetch_reading_types(&self) -> Result<BTreeMap<String, ReadingType>>;

    async fn fetch_coin_packages(&self) -> Result<Vec<CoinPackage>>;

    async fn fetch_quiz_questions(&self) -> Result<Vec<QuizQuestion>>;

    async fn fetch_quote(&self) -> Result<Quote>;

    /// Perform a reading; the service has not charged anything client-side
    async fn request_reading(&self, request: &ReadingRequest) -> Result<Reading>;

    async fn purchase_coins(&self, user_id: &str, request: &PurchaseRequest)
        -> Result<PurchaseReceipt>;

    async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizScore>;
}

/// Fetch every catalog concurrently; the first failure fails the whole load
pub async fn fetch_catalogs(gateway: &dyn Gateway) -> Result<Catalog> {
    let (readers, cards, reading_types, coin_packages, quiz_questions, quote) = futures::try_join!(
        gateway.fetch_readers(),
        gateway.fetch_cards(),
        gateway.fetch_reading_types(),
        gateway.fetch_coin_packages(),
        gateway.fetch_quiz_questions(),
        gateway.fetch_quote(),
    )?;

    Ok(Catalog {
        readers,
        cards,
        reading_types,
        coin_packages,
        quiz_questions,
        quote: quote.quote,
    })
}
