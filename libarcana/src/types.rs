//! Catalog and record types exchanged with the reading service

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An AI tarot reader offered by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub accuracy: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
}

/// A spread the user can pay for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: u64,
}

/// Upright or reversed meaning of a card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardFace {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TarotCard {
    /// Catalog key; filled from the map key when the body omits it
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub suit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub upright: CardFace,
    #[serde(default)]
    pub reversed: CardFace,
}

impl TarotCard {
    /// Case-insensitive match on name or any upright/reversed keyword
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .upright
                .keywords
                .iter()
                .chain(self.reversed.keywords.iter())
                .any(|keyword| keyword.to_lowercase().contains(needle))
    }
}

/// The card catalog, in the order the service listed it
///
/// On the wire this is a JSON object keyed by card id. Catalog order is
/// document order, which the library page relies on for its first page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardDeck {
    cards: Vec<TarotCard>,
}

impl CardDeck {
    pub fn new(cards: Vec<TarotCard>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TarotCard> {
        self.cards.iter()
    }

    pub fn get(&self, id: &str) -> Option<&TarotCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// First `n` cards in catalog order
    pub fn first(&self, n: usize) -> Vec<TarotCard> {
        self.cards.iter().take(n).cloned().collect()
    }
}

impl Serialize for CardDeck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cards.len()))?;
        for card in &self.cards {
            map.serialize_entry(&card.id, card)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CardDeck {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeckVisitor;

        impl<'de> Visitor<'de> for DeckVisitor {
            type Value = CardDeck;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of card id to card")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CardDeck, A::Error> {
                let mut cards = Vec::with_capacity(access.size_hint().unwrap_or(78));
                while let Some((id, mut card)) = access.next_entry::<String, TarotCard>()? {
                    if card.id.is_empty() {
                        card.id = id;
                    }
                    cards.push(card);
                }
                Ok(CardDeck { cards })
            }
        }

        deserializer.deserialize_map(DeckVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinPackage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub coins: u64,
    #[serde(default)]
    pub bonus: u64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option
    pub correct: usize,
}

impl QuizQuestion {
    /// Display label for the option at `index`: `a`..`z`, then 1-based numbers
    pub fn option_label(index: usize) -> String {
        u8::try_from(index)
            .ok()
            .filter(|offset| *offset < 26)
            .map(|offset| char::from(b'a' + offset).to_string())
            .unwrap_or_else(|| (index + 1).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
}

/// Read-only reference data, loaded once per session
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub readers: Vec<Reader>,
    pub cards: CardDeck,
    pub reading_types: BTreeMap<String, ReadingType>,
    pub coin_packages: Vec<CoinPackage>,
    pub quiz_questions: Vec<QuizQuestion>,
    pub quote: String,
}

impl Catalog {
    pub fn reader(&self, id: &str) -> Option<&Reader> {
        self.readers.iter().find(|reader| reader.id == id)
    }

    pub fn reading_type(&self, key: &str) -> Option<&ReadingType> {
        self.reading_types.get(key)
    }

    pub fn coin_package(&self, id: &str) -> Option<&CoinPackage> {
        self.coin_packages.iter().find(|package| package.id == id)
    }
}

/// A card as drawn in a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnCard {
    pub card: TarotCard,
    #[serde(deserialize_with = "string_or_number")]
    pub position: String,
    #[serde(default)]
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInterpretation {
    #[serde(deserialize_with = "string_or_number")]
    pub position: String,
    pub card_name: String,
    pub interpretation: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub summary: String,
    #[serde(default)]
    pub cards: Vec<CardInterpretation>,
}

/// A completed reading as returned by the service and kept in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub reader: Reader,
    #[serde(default)]
    pub question: String,
    pub cards: Vec<DrawnCard>,
    pub interpretation: Interpretation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Coins debited for this reading; stamped client-side
    #[serde(default)]
    pub cost: u64,
}

/// Quiz outcome kept in the user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub coins_earned: u64,
    pub new_balance: u64,
    #[serde(default)]
    pub experience_earned: u64,
    pub timestamp: DateTime<Utc>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}
