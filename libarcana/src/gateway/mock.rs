//! Mock gateway implementation for testing
//!
//! A configurable in-process stand-in for the reading service. It serves a
//! small fixture catalog, keeps a server-side coin ledger, records every
//! call, and can be told to fail individual operations or to delay
//! responses. Clones share all state, so a test can keep one clone while the
//! service owns another.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use super::{
    Gateway, PurchaseReceipt, PurchaseRequest, QuizScore, QuizSubmission, ReadingRequest,
};
use crate::error::{GatewayError, Result};
use crate::rewards::rewards_for;
use crate::types::{
    CardDeck, CardFace, CardInterpretation, CoinPackage, DrawnCard, Interpretation, QuizQuestion,
    Quote, Reader, Reading, ReadingType, TarotCard,
};

/// Gateway operations, used to target failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchReaders,
    FetchCards,
    FetchReadingTypes,
    FetchCoinPackages,
    FetchQuizQuestions,
    FetchQuote,
    RequestReading,
    PurchaseCoins,
    SubmitQuiz,
}

/// Catalog served by the mock
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub readers: Vec<Reader>,
    pub cards: CardDeck,
    pub reading_types: BTreeMap<String, ReadingType>,
    pub coin_packages: Vec<CoinPackage>,
    pub quiz_questions: Vec<QuizQuestion>,
    pub quote: String,

    /// Coin balance the service believes the user has
    pub server_balance: u64,

    /// Fixed quiz score to return instead of grading the answers
    pub quiz_score: Option<QuizScore>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            readers: fixture_readers(),
            cards: fixture_cards(),
            reading_types: fixture_reading_types(),
            coin_packages: fixture_packages(),
            quiz_questions: fixture_questions(),
            quote: "The cards reveal what the heart already knows.".to_string(),
            server_balance: 10,
            quiz_score: None,
            delay: Duration::from_millis(0),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    failures: HashMap<Operation, GatewayError>,
    calls: Vec<Operation>,
    reading_requests: Vec<ReadingRequest>,
    purchases: Vec<(String, PurchaseRequest)>,
    submissions: Vec<QuizSubmission>,
    server_balance: u64,
}

/// Mock reading service for testing
#[derive(Debug, Clone)]
pub struct MockGateway {
    config: Arc<MockConfig>,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockGateway {
    pub fn new(config: MockConfig) -> Self {
        let state = MockState {
            server_balance: config.server_balance,
            ..Default::default()
        };
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make `operation` fail with `error` until cleared
    pub fn failing(self, operation: Operation, error: GatewayError) -> Self {
        self.set_failure(operation, Some(error));
        self
    }

    pub fn set_failure(&self, operation: Operation, error: Option<GatewayError>) {
        let mut state = self.lock();
        match error {
            Some(error) => {
                state.failures.insert(operation, error);
            }
            None => {
                state.failures.remove(&operation);
            }
        }
    }

    pub fn set_server_balance(&self, balance: u64) {
        self.lock().server_balance = balance;
    }

    pub fn server_balance(&self) -> u64 {
        self.lock().server_balance
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock().calls.iter().filter(|call| **call == operation).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn reading_requests(&self) -> Vec<ReadingRequest> {
        self.lock().reading_requests.clone()
    }

    pub fn purchases(&self) -> Vec<(String, PurchaseRequest)> {
        self.lock().purchases.clone()
    }

    pub fn submissions(&self) -> Vec<QuizSubmission> {
        self.lock().submissions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, wait out the delay, then apply any injected failure
    async fn enter(&self, operation: Operation) -> Result<()> {
        self.lock().calls.push(operation);

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        match self.lock().failures.get(&operation) {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }

    fn draw(&self, count: usize) -> Vec<DrawnCard> {
        self.config
            .cards
            .iter()
            .take(count)
            .enumerate()
            .map(|(index, card)| DrawnCard {
                card: card.clone(),
                position: (index + 1).to_string(),
                reversed: index % 2 == 1,
            })
            .collect()
    }
}

fn cards_for_spread(reading_type: &str) -> usize {
    match reading_type {
        "three_card" => 3,
        "celtic_cross" => 10,
        _ => 1,
    }
}

fn not_found(what: &str, id: &str) -> GatewayError {
    GatewayError::Service {
        status: 404,
        message: Some(format!("{} not found: {}", what, id)),
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_readers(&self) -> Result<Vec<Reader>> {
        self.enter(Operation::FetchReaders).await?;
        Ok(self.config.readers.clone())
    }

    async fn fetch_cards(&self) -> Result<CardDeck> {
        self.enter(Operation::FetchCards).await?;
        Ok(self.config.cards.clone())
    }

    async fn fetch_reading_types(&self) -> Result<BTreeMap<String, ReadingType>> {
        self.enter(Operation::FetchReadingTypes).await?;
        Ok(self.config.reading_types.clone())
    }

    async fn fetch_coin_packages(&self) -> Result<Vec<CoinPackage>> {
        self.enter(Operation::FetchCoinPackages).await?;
        Ok(self.config.coin_packages.clone())
    }

    async fn fetch_quiz_questions(&self) -> Result<Vec<QuizQuestion>> {
        self.enter(Operation::FetchQuizQuestions).await?;
        Ok(self.config.quiz_questions.clone())
    }

    async fn fetch_quote(&self) -> Result<Quote> {
        self.enter(Operation::FetchQuote).await?;
        Ok(Quote {
            quote: self.config.quote.clone(),
        })
    }

    async fn request_reading(&self, request: &ReadingRequest) -> Result<Reading> {
        self.enter(Operation::RequestReading).await?;

        let reader = self
            .config
            .readers
            .iter()
            .find(|reader| reader.id == request.reader_id)
            .cloned()
            .ok_or_else(|| not_found("Reader", &request.reader_id))?;
        let reading_type = self
            .config
            .reading_types
            .get(&request.reading_type)
            .ok_or_else(|| not_found("Reading type", &request.reading_type))?;

        let cards = self.draw(cards_for_spread(&request.reading_type));
        let interpretations = cards
            .iter()
            .map(|drawn| {
                let face = if drawn.reversed {
                    &drawn.card.reversed
                } else {
                    &drawn.card.upright
                };
                CardInterpretation {
                    position: drawn.position.clone(),
                    card_name: drawn.card.name.clone(),
                    interpretation: face.description.clone(),
                    keywords: face.keywords.clone(),
                }
            })
            .collect();

        let mut state = self.lock();
        state.server_balance = state.server_balance.saturating_sub(reading_type.cost);
        state.reading_requests.push(request.clone());
        let reading_number = state.reading_requests.len();

        Ok(Reading {
            id: Some(format!("reading_{}", reading_number)),
            reader,
            question: request.question.clone(),
            cards,
            interpretation: Interpretation {
                summary: format!("The {} reveals a path forward.", reading_type.name),
                cards: interpretations,
            },
            timestamp: None,
            cost: 0,
        })
    }

    async fn purchase_coins(
        &self,
        user_id: &str,
        request: &PurchaseRequest,
    ) -> Result<PurchaseReceipt> {
        self.enter(Operation::PurchaseCoins).await?;

        let package = self
            .config
            .coin_packages
            .iter()
            .find(|package| package.id == request.package_id)
            .ok_or_else(|| not_found("Package", &request.package_id))?;
        let coins_added = package.coins + package.bonus;

        let mut state = self.lock();
        state.server_balance += coins_added;
        state
            .purchases
            .push((user_id.to_string(), request.clone()));

        Ok(PurchaseReceipt {
            new_balance: state.server_balance,
            coins_added,
        })
    }

    async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizScore> {
        self.enter(Operation::SubmitQuiz).await?;

        let mut state = self.lock();
        state.submissions.push(submission.clone());

        if let Some(score) = &self.config.quiz_score {
            state.server_balance = score.new_balance;
            return Ok(score.clone());
        }

        // Grade against the bank rather than trusting the client's flags
        let total = submission.answers.len() as u32;
        let score = submission
            .answers
            .iter()
            .filter(|answer| {
                self.config
                    .quiz_questions
                    .iter()
                    .any(|q| q.id == answer.question_id && q.correct == answer.answer)
            })
            .count() as u32;
        let percentage = if total == 0 {
            0.0
        } else {
            f64::from(score) * 100.0 / f64::from(total)
        };
        let coins_earned = rewards_for(percentage).coins;
        state.server_balance += coins_earned;

        Ok(QuizScore {
            score,
            total,
            percentage,
            coins_earned,
            new_balance: state.server_balance,
        })
    }
}

fn fixture_readers() -> Vec<Reader> {
    [
        ("luna", "Luna", "Love & Relationships", "94%"),
        ("sage", "Sage", "Career & Purpose", "91%"),
        ("orion", "Orion", "Spiritual Growth", "89%"),
    ]
    .into_iter()
    .map(|(id, name, specialty, accuracy)| Reader {
        id: id.to_string(),
        name: name.to_string(),
        specialty: specialty.to_string(),
        accuracy: accuracy.to_string(),
        description: format!("{} reads the cards with a focus on {}.", name, specialty),
        icon: None,
        personality: None,
    })
    .collect()
}

fn fixture_cards() -> CardDeck {
    const MAJOR: [(&str, &str, &str); 22] = [
        ("The Fool", "beginnings", "recklessness"),
        ("The Magician", "manifestation", "manipulation"),
        ("The High Priestess", "intuition", "secrets"),
        ("The Empress", "abundance", "dependence"),
        ("The Emperor", "authority", "tyranny"),
        ("The Hierophant", "tradition", "rebellion"),
        ("The Lovers", "harmony", "imbalance"),
        ("The Chariot", "willpower", "aggression"),
        ("Strength", "courage", "self-doubt"),
        ("The Hermit", "introspection", "isolation"),
        ("Wheel of Fortune", "destiny", "bad luck"),
        ("Justice", "fairness", "dishonesty"),
        ("The Hanged Man", "surrender", "stalling"),
        ("Death", "transformation", "resistance"),
        ("Temperance", "balance", "excess"),
        ("The Devil", "attachment", "release"),
        ("The Tower", "upheaval", "averted disaster"),
        ("The Star", "hope", "despair"),
        ("The Moon", "illusion", "clarity"),
        ("The Sun", "joy", "gloom"),
        ("Judgement", "rebirth", "self-doubt"),
        ("The World", "completion", "stagnation"),
    ];
    const MINOR: [(&str, &str, &str, &str); 4] = [
        ("Ace of Cups", "Cups", "new love", "blocked emotions"),
        ("Two of Cups", "Cups", "partnership", "breakup"),
        ("Ace of Wands", "Wands", "inspiration", "delays"),
        ("Ace of Swords", "Swords", "breakthrough", "confusion"),
    ];

    let major = MAJOR
        .iter()
        .enumerate()
        .map(|(index, (name, up, down))| {
            card(format!("major_{:02}", index), name, "Major Arcana", up, down)
        });
    let minor = MINOR.iter().map(|(name, suit, up, down)| {
        card(
            name.to_lowercase().replace(' ', "_"),
            name,
            suit,
            up,
            down,
        )
    });

    CardDeck::new(major.chain(minor).collect())
}

fn card(id: String, name: &str, suit: &str, upright: &str, reversed: &str) -> TarotCard {
    TarotCard {
        id,
        name: name.to_string(),
        suit: suit.to_string(),
        image: None,
        upright: CardFace {
            description: format!("{} speaks of {}.", name, upright),
            keywords: vec![upright.to_string()],
        },
        reversed: CardFace {
            description: format!("{} reversed warns of {}.", name, reversed),
            keywords: vec![reversed.to_string()],
        },
    }
}

fn fixture_reading_types() -> BTreeMap<String, ReadingType> {
    [
        ("single_card", "Single Card", "One card for quick guidance", 1),
        ("three_card", "Three Card Spread", "Past, present and future", 3),
        ("celtic_cross", "Celtic Cross", "A deep ten-card exploration", 10),
    ]
    .into_iter()
    .map(|(key, name, description, cost)| {
        (
            key.to_string(),
            ReadingType {
                name: name.to_string(),
                description: description.to_string(),
                cost,
            },
        )
    })
    .collect()
}

fn fixture_packages() -> Vec<CoinPackage> {
    vec![
        CoinPackage {
            id: "starter".to_string(),
            coins: 50,
            bonus: 0,
            price: 99.0,
        },
        CoinPackage {
            id: "seeker".to_string(),
            coins: 120,
            bonus: 20,
            price: 199.0,
        },
        CoinPackage {
            id: "oracle".to_string(),
            coins: 300,
            bonus: 75,
            price: 449.0,
        },
    ]
}

fn fixture_questions() -> Vec<QuizQuestion> {
    [
        (1, "How many cards are in a standard tarot deck?", ["56", "72", "78", "82"], 2),
        (2, "Which card is numbered zero?", ["The Magician", "The Fool", "The World", "Death"], 1),
        (3, "Which suit is associated with emotions?", ["Wands", "Swords", "Pentacles", "Cups"], 3),
        (4, "How many cards form the Major Arcana?", ["22", "21", "24", "12"], 0),
        (5, "Which suit is associated with the element of air?", ["Cups", "Swords", "Wands", "Pentacles"], 1),
        (6, "Which card follows The Tower?", ["The Star", "The Moon", "The Devil", "The Sun"], 0),
        (7, "What does a reversed card usually signal?", ["Nothing", "Blocked energy", "A misprint", "Luck"], 1),
    ]
    .into_iter()
    .map(|(id, question, options, correct)| QuizQuestion {
        id,
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::QuizAnswer;

    #[test]
    fn test_fixture_sizes() {
        let config = MockConfig::default();
        assert_eq!(config.cards.len(), 26);
        assert_eq!(config.quiz_questions.len(), 7);
        assert_eq!(config.reading_types["three_card"].cost, 3);
    }

    #[tokio::test]
    async fn test_reading_draws_spread_and_debits_ledger() {
        let gateway = MockGateway::default();
        let reading = gateway
            .request_reading(&ReadingRequest {
                reader_id: "luna".to_string(),
                reading_type: "three_card".to_string(),
                question: "Will it work out?".to_string(),
                user_id: "user_1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reading.cards.len(), 3);
        assert_eq!(reading.interpretation.cards.len(), 3);
        assert_eq!(reading.reader.name, "Luna");
        assert_eq!(gateway.server_balance(), 7);
        assert_eq!(gateway.call_count(Operation::RequestReading), 1);
    }

    #[tokio::test]
    async fn test_unknown_reader_is_service_error() {
        let gateway = MockGateway::default();
        let err = gateway
            .request_reading(&ReadingRequest {
                reader_id: "ghost".to_string(),
                reading_type: "single_card".to_string(),
                question: String::new(),
                user_id: "user_1".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.service_message(), Some("Reader not found: ghost"));
    }

    #[tokio::test]
    async fn test_injected_failure_can_be_cleared() {
        let gateway = MockGateway::default()
            .failing(Operation::FetchReaders, GatewayError::Network("down".to_string()));

        assert!(gateway.fetch_readers().await.is_err());
        gateway.set_failure(Operation::FetchReaders, None);
        assert!(gateway.fetch_readers().await.is_ok());
        assert_eq!(gateway.call_count(Operation::FetchReaders), 2);
    }

    #[tokio::test]
    async fn test_quiz_grading() {
        let gateway = MockGateway::default();
        let answers = vec![
            QuizAnswer { question_id: 1, answer: 2, correct: true },
            QuizAnswer { question_id: 2, answer: 0, correct: false },
        ];

        let score = gateway
            .submit_quiz(&QuizSubmission {
                answers,
                user_id: "user_1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(score.score, 1);
        assert_eq!(score.total, 2);
        assert_eq!(score.percentage, 50.0);
        assert_eq!(score.coins_earned, 2);
        assert_eq!(score.new_balance, 12);
    }

    #[tokio::test]
    async fn test_purchase_adds_bonus() {
        let gateway = MockGateway::default();
        let receipt = gateway
            .purchase_coins(
                "user_1",
                &PurchaseRequest {
                    package_id: "seeker".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(receipt.coins_added, 140);
        assert_eq!(receipt.new_balance, 150);
        assert_eq!(gateway.purchases()[0].0, "user_1");
    }
}
