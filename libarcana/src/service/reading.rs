//! Reader/spread selection and the perform-reading flow

use chrono::Utc;
use tracing::{debug, info, warn};

use super::effects::SoundCue;
use super::events::{Event, Flow};
use super::navigation::Page;
use super::notifications::Severity;
use super::selection::search_cards;
use super::ArcanaService;
use crate::error::{PreconditionError, Result};
use crate::gateway::ReadingRequest;
use crate::profile::Achievement;
use crate::types::{Reading, TarotCard};

impl ArcanaService {
    pub fn select_reader(&mut self, reader_id: &str) -> Result<()> {
        self.ensure_ready()?;
        if self.catalog.reader(reader_id).is_none() {
            return Err(self.reject(PreconditionError::UnknownReader(reader_id.to_string())));
        }

        self.selection.reader = Some(reader_id.to_string());
        self.selection_changed();
        Ok(())
    }

    pub fn select_reading_type(&mut self, key: &str) -> Result<()> {
        self.ensure_ready()?;
        if self.catalog.reading_type(key).is_none() {
            return Err(self.reject(PreconditionError::UnknownReadingType(key.to_string())));
        }

        self.selection.reading_type = Some(key.to_string());
        self.selection_changed();
        Ok(())
    }

    pub fn set_question(&mut self, question: impl Into<String>) {
        self.selection.question = question.into();
    }

    /// Re-filter the library from the full deck
    pub fn search_cards(&mut self, query: &str) -> &[TarotCard] {
        self.selection.search_query = query.to_string();
        self.selection.filtered_cards = search_cards(&self.catalog.cards, query);
        &self.selection.filtered_cards
    }

    /// Request a reading for the current selection
    ///
    /// Coins are debited only after the service confirms the reading.
    pub async fn perform_reading(&mut self) -> Result<Reading> {
        self.ensure_ready()?;

        let (reader_id, type_key) = match (&self.selection.reader, &self.selection.reading_type) {
            (Some(reader), Some(reading_type)) => (reader.clone(), reading_type.clone()),
            _ => return Err(self.reject(PreconditionError::MissingSelection)),
        };
        let cost = match self.catalog.reading_type(&type_key) {
            Some(reading_type) => reading_type.cost,
            None => return Err(self.reject(PreconditionError::UnknownReadingType(type_key))),
        };
        if !self.profile.can_afford(cost) {
            let shortfall = PreconditionError::InsufficientBalance {
                required: cost,
                available: self.profile.balance,
            };
            return Err(self.reject(shortfall));
        }

        let request = ReadingRequest {
            reader_id,
            reading_type: type_key,
            question: self.selection.question.clone(),
            user_id: self.profile.id.clone(),
        };

        debug!(reader = %request.reader_id, reading_type = %request.reading_type, cost, "Requesting reading");
        self.event_bus.emit(Event::FlowStarted {
            flow: Flow::Reading,
        });

        let mut reading = match self.gateway.request_reading(&request).await {
            Ok(reading) => reading,
            Err(err) => {
                warn!("Reading request failed: {}", err);
                let message = err.service_message().unwrap_or("Error performing reading");
                self.notify(message, Severity::Error);
                self.finish(Flow::Reading, false);
                return Err(err);
            }
        };

        reading.cost = cost;
        reading.timestamp.get_or_insert_with(Utc::now);

        if let Err(e) = self.profile.debit(cost) {
            self.finish(Flow::Reading, false);
            return Err(self.reject(e));
        }
        self.profile.record_reading(reading.clone());
        self.save_profile();

        self.current_reading = Some(reading.clone());
        self.go(Page::ReadingResult);

        info!(cost, balance = self.profile.balance, "Reading completed");
        self.notify("Reading completed! The cards have spoken.", Severity::Success);
        if self.profile.preferences.sound_enabled {
            self.play(SoundCue::CardFlip);
        }

        self.award_achievements(&[Achievement::FirstReading, Achievement::TenthReading]);
        self.finish(Flow::Reading, true);

        Ok(reading)
    }

    fn selection_changed(&self) {
        self.event_bus.emit(Event::SelectionChanged {
            reader: self.selection.reader.clone(),
            reading_type: self.selection.reading_type.clone(),
        });
    }
}
