//! Per-session selection state and card search

use serde::Serialize;

use crate::types::{CardDeck, TarotCard};

/// Cards shown by the library page when no query is active
pub const DEFAULT_CARD_PAGE: usize = 20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionState {
    pub reader: Option<String>,
    pub reading_type: Option<String>,
    pub question: String,
    pub search_query: String,
    pub filtered_cards: Vec<TarotCard>,
}

impl SelectionState {
    /// Fresh selection seeded with the default card page
    pub fn seeded(deck: &CardDeck) -> Self {
        Self {
            filtered_cards: deck.first(DEFAULT_CARD_PAGE),
            ..Self::default()
        }
    }
}

/// Filter the full deck by `query`
///
/// A blank query yields the first [`DEFAULT_CARD_PAGE`] cards in catalog
/// order. Otherwise every card whose name or any upright/reversed keyword
/// contains the query (case-insensitive) is returned, uncapped.
pub fn search_cards(deck: &CardDeck, query: &str) -> Vec<TarotCard> {
    if query.trim().is_empty() {
        return deck.first(DEFAULT_CARD_PAGE);
    }

    let needle = query.to_lowercase();
    deck.iter().filter(|card| card.matches(&needle)).cloned().collect()
}
