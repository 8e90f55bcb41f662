//! Application orchestrator
//!
//! `ArcanaService` owns the whole client session: the catalog, the user's
//! selection, the active quiz, the current page, the notification queue and
//! the user profile. Each user action has one entry point on it, and every
//! state change is announced on the event bus so that renderers never need
//! to poll.
//!
//! # Flows
//!
//! - [`ArcanaService::start`]: fetch every catalog concurrently
//! - [`ArcanaService::perform_reading`]: validate, request, then debit
//! - [`ArcanaService::purchase_coins`]: replace the balance with the service's
//! - [`ArcanaService::start_quiz`], [`ArcanaService::answer_question`] and
//!   [`ArcanaService::submit_quiz`]
//! - [`ArcanaService::search_cards`] and the preference toggles
//!
//! Async flows take `&mut self`, so one orchestrator never runs two flows at
//! once. Every profile mutation is written through to the profile store
//! before the flow returns.
//!
//! # Example
//!
//! ```no_run
//! use libarcana::service::ArcanaService;
//! use libarcana::Config;
//!
//! # async fn example() -> libarcana::Result<()> {
//! let mut service = ArcanaService::from_config(&Config::load()?)?;
//! let mut events = service.subscribe();
//!
//! service.start().await?;
//! service.select_reader("luna")?;
//! service.select_reading_type("three_card")?;
//! service.set_question("What should I focus on this month?");
//!
//! let reading = service.perform_reading().await?;
//! println!("{}", reading.interpretation.summary);
//!
//! while let Ok(event) = events.try_recv() {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod effects;
pub mod events;
pub mod navigation;
pub mod notifications;
pub mod quiz;
pub mod reading;
pub mod selection;
pub mod shop;

use std::sync::Arc;
use std::time::Duration;

use self::effects::{NoopEffects, SoundCue, SoundEffects};
use self::events::{Event, EventBus, EventReceiver, Flow};
use self::navigation::{NavAction, Navigator, Page};
use self::notifications::{NotificationQueue, Severity};
use self::quiz::QuizSession;
use self::selection::SelectionState;
use crate::config::Config;
use crate::error::{ArcanaError, PreconditionError, Result};
use crate::gateway::{fetch_catalogs, Gateway, HttpGateway};
use crate::profile::{Achievement, Theme, UserProfile};
use crate::storage::{JsonFileStore, ProfileStore};
use crate::types::{Catalog, Reading};

/// Catalog loading status
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Startup failed; carries the reason shown to the user
    Failed(String),
}

pub struct ArcanaService {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn ProfileStore>,
    effects: Arc<dyn SoundEffects>,
    event_bus: EventBus,
    notifications: NotificationQueue,
    navigator: Navigator,
    load_state: LoadState,
    catalog: Catalog,
    selection: SelectionState,
    quiz: Option<QuizSession>,
    current_reading: Option<Reading>,
    profile: UserProfile,
}

impl ArcanaService {
    /// Create an orchestrator and load (or initialise) the profile
    ///
    /// # Errors
    ///
    /// Returns an error if the stored profile cannot be read or parsed, or
    /// if a freshly created profile cannot be saved.
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn ProfileStore>,
        notification_ttl: Duration,
    ) -> Result<Self> {
        let profile = match store.load()? {
            Some(mut profile) => {
                if profile.normalize() {
                    tracing::info!(level = profile.level, "Re-derived stale profile level");
                    store.save(&profile)?;
                }
                profile
            }
            None => {
                let profile = UserProfile::new();
                tracing::info!(id = %profile.id, "Initialised new profile");
                store.save(&profile)?;
                profile
            }
        };

        let event_bus = EventBus::new(100);
        let notifications = NotificationQueue::new(notification_ttl, event_bus.clone());

        Ok(Self {
            gateway,
            store,
            effects: Arc::new(NoopEffects),
            event_bus,
            notifications,
            navigator: Navigator::new(),
            load_state: LoadState::Loading,
            catalog: Catalog::default(),
            selection: SelectionState::default(),
            quiz: None,
            current_reading: None,
            profile,
        })
    }

    /// Create an orchestrator talking HTTP and persisting to the data dir
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = HttpGateway::new(config)?;
        let store = JsonFileStore::new(&config.data_dir());
        Self::new(
            Arc::new(gateway),
            Arc::new(store),
            config.notification_ttl()?,
        )
    }

    pub fn with_effects(mut self, effects: Arc<dyn SoundEffects>) -> Self {
        self.effects = effects;
        self
    }

    /// Load every catalog; on failure the service stays in [`LoadState::Failed`]
    ///
    /// May be called again to retry after a failure.
    pub async fn start(&mut self) -> Result<()> {
        self.load_state = LoadState::Loading;
        self.event_bus.emit(Event::FlowStarted {
            flow: Flow::Startup,
        });

        match fetch_catalogs(self.gateway.as_ref()).await {
            Ok(catalog) => {
                tracing::info!(
                    readers = catalog.readers.len(),
                    cards = catalog.cards.len(),
                    questions = catalog.quiz_questions.len(),
                    "Catalogs loaded"
                );
                self.selection = SelectionState::seeded(&catalog.cards);
                self.event_bus.emit(Event::CatalogLoaded {
                    readers: catalog.readers.len(),
                    cards: catalog.cards.len(),
                });
                self.catalog = catalog;
                self.load_state = LoadState::Ready;

                if self.profile.preferences.sound_enabled {
                    self.play(SoundCue::Ambient);
                }
                self.finish(Flow::Startup, true);
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::error!("Failed to load catalogs: {}", reason);

                self.load_state = LoadState::Failed(reason.clone());
                self.event_bus.emit(Event::CatalogFailed {
                    error: reason.clone(),
                });
                self.notify(
                    PreconditionError::CatalogUnavailable(reason).to_string(),
                    Severity::Error,
                );
                self.finish(Flow::Startup, false);
                Err(err)
            }
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub fn current_reading(&self) -> Option<&Reading> {
        self.current_reading.as_ref()
    }

    pub fn current_page(&self) -> Page {
        self.navigator.current()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Subscribe to state-change events
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Whether `page` can be shown right now
    pub fn can_enter(&self, page: Page) -> std::result::Result<(), PreconditionError> {
        match page {
            Page::ReadingResult if self.current_reading.is_none() => {
                Err(PreconditionError::NoCurrentReading)
            }
            Page::Quiz if self.quiz.is_none() => Err(PreconditionError::NoActiveQuiz),
            _ => Ok(()),
        }
    }

    pub fn navigate(&mut self, page: Page) -> Result<()> {
        self.can_enter(page).map_err(|e| self.reject(e))?;
        self.go(page);
        Ok(())
    }

    /// Return to home; an open quiz stays open
    pub fn back(&mut self) {
        if let Some((from, to)) = self.navigator.apply(NavAction::Back) {
            self.event_bus.emit(Event::PageChanged { from, to });
        }
    }

    pub fn toggle_sound(&mut self) -> bool {
        let enabled = self.profile.toggle_sound();
        self.save_profile();
        enabled
    }

    pub fn toggle_animations(&mut self) -> bool {
        let enabled = self.profile.toggle_animations();
        self.save_profile();
        enabled
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.profile.set_theme(theme);
        self.save_profile();
    }

    pub fn dismiss_notification(&self, id: u64) -> bool {
        self.notifications.dismiss(id)
    }

    fn go(&mut self, page: Page) {
        if let Some((from, to)) = self.navigator.apply(NavAction::NavigateTo(page)) {
            tracing::debug!(%from, %to, "Page changed");
            self.event_bus.emit(Event::PageChanged { from, to });
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        let blocked = match &self.load_state {
            LoadState::Ready => return Ok(()),
            LoadState::Loading => PreconditionError::NotLoaded,
            LoadState::Failed(reason) => PreconditionError::CatalogUnavailable(reason.clone()),
        };
        Err(self.reject(blocked))
    }

    /// Surface a precondition failure as a notification and an error
    fn reject(&self, error: PreconditionError) -> ArcanaError {
        tracing::warn!("Rejected: {}", error);
        self.notify(error.to_string(), error.severity());
        error.into()
    }

    fn notify(&self, message: impl Into<String>, severity: Severity) -> u64 {
        self.notifications.push(message, severity)
    }

    /// Write the profile through to the store
    ///
    /// A failed write leaves the in-memory profile as it is and warns the
    /// user; nothing is rolled back.
    fn save_profile(&self) {
        if let Err(e) = self.store.save(&self.profile) {
            tracing::error!("Failed to persist profile: {}", e);
            self.notify("Your progress could not be saved", Severity::Warning);
        }
        self.event_bus.emit(Event::ProfileUpdated {
            balance: self.profile.balance,
            level: self.profile.level,
            experience: self.profile.experience,
        });
    }

    fn play(&self, cue: SoundCue) {
        if let Err(e) = self.effects.play(cue) {
            tracing::debug!(?cue, "Sound cue failed: {}", e);
        }
    }

    fn finish(&self, flow: Flow, success: bool) {
        self.event_bus.emit(Event::FlowFinished { flow, success });
    }

    /// Award any of `candidates` the profile now qualifies for
    fn award_achievements(&mut self, candidates: &[Achievement]) {
        let mut earned = Vec::new();
        for &achievement in candidates {
            let qualifies = match achievement {
                Achievement::FirstReading => !self.profile.reading_history.is_empty(),
                Achievement::TenthReading => self.profile.reading_history.len() >= 10,
                Achievement::PerfectQuiz => self
                    .profile
                    .quiz_history
                    .iter()
                    .any(|result| result.percentage >= 100.0),
                Achievement::CoinCollector => self.profile.balance >= 100,
            };
            if qualifies && self.profile.award(achievement) {
                earned.push(achievement);
            }
        }

        if earned.is_empty() {
            return;
        }
        self.save_profile();
        for achievement in earned {
            tracing::info!(?achievement, "Achievement unlocked");
            self.notify(
                format!(
                    "Achievement unlocked: {}! {}",
                    achievement.title(),
                    achievement.description()
                ),
                Severity::Info,
            );
        }
    }
}
