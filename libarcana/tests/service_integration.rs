//! Integration tests for ArcanaService
//!
//! Drives the orchestrator's flows end to end against the mock gateway and
//! an in-memory profile store.

use std::sync::Arc;
use std::time::Duration;

use libarcana::error::{ArcanaError, GatewayError, PreconditionError};
use libarcana::gateway::mock::{MockConfig, MockGateway, Operation};
use libarcana::gateway::QuizScore;
use libarcana::profile::{level_for, Achievement, UserProfile};
use libarcana::service::effects::{RecordingEffects, SoundCue};
use libarcana::service::events::{Event, Flow};
use libarcana::service::navigation::Page;
use libarcana::service::notifications::{Severity, DEFAULT_TTL};
use libarcana::service::ArcanaService;
use libarcana::storage::{MemoryStore, ProfileStore};
use libarcana::JsonFileStore;
use tempfile::TempDir;

/// Correct options for the first five fixture questions
const CORRECT_ANSWERS: [(u32, usize); 5] = [(1, 2), (2, 1), (3, 3), (4, 0), (5, 1)];

struct Harness {
    service: ArcanaService,
    gateway: MockGateway,
    store: MemoryStore,
    effects: RecordingEffects,
}

async fn setup_with(gateway: MockGateway, store: MemoryStore) -> Harness {
    let effects = RecordingEffects::new();
    let mut service = ArcanaService::new(
        Arc::new(gateway.clone()),
        Arc::new(store.clone()),
        DEFAULT_TTL,
    )
    .unwrap()
    .with_effects(Arc::new(effects.clone()));

    service.start().await.unwrap();

    Harness {
        service,
        gateway,
        store,
        effects,
    }
}

async fn setup() -> Harness {
    setup_with(MockGateway::default(), MemoryStore::new()).await
}

fn seeded_store(profile: &UserProfile) -> MemoryStore {
    MemoryStore::with_profile(profile).unwrap()
}

fn messages(service: &ArcanaService) -> Vec<String> {
    service
        .notifications()
        .snapshot()
        .into_iter()
        .map(|n| n.message)
        .collect()
}

fn quiz_score(percentage: f64, new_balance: u64) -> QuizScore {
    QuizScore {
        score: 4,
        total: 5,
        percentage,
        coins_earned: 8,
        new_balance,
    }
}

#[tokio::test]
async fn test_reading_end_to_end_debits_cost() {
    let mut h = setup().await;
    assert_eq!(h.service.profile().balance, 10);

    h.service.select_reader("luna").unwrap();
    h.service.select_reading_type("three_card").unwrap();
    h.service.set_question("Should I take the new job?");
    let reading = h.service.perform_reading().await.unwrap();

    assert_eq!(h.service.profile().balance, 7);
    assert_eq!(h.service.profile().reading_history.len(), 1);
    assert_eq!(h.service.current_page(), Page::ReadingResult);
    assert_eq!(h.service.current_reading(), Some(&reading));
    assert_eq!(reading.cost, 3);
    assert!(reading.timestamp.is_some());
    assert_eq!(reading.question, "Should I take the new job?");

    let sent = h.gateway.reading_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reader_id, "luna");
    assert_eq!(sent[0].user_id, h.service.profile().id);

    let saved = h.store.load().unwrap().unwrap();
    assert_eq!(saved.balance, 7);
    assert_eq!(saved.reading_history.len(), 1);
    assert!(saved.has_achievement(Achievement::FirstReading));

    assert!(messages(&h.service).contains(&"Reading completed! The cards have spoken.".to_string()));
    assert_eq!(h.effects.played(), vec![SoundCue::Ambient, SoundCue::CardFlip]);
}

#[tokio::test]
async fn test_insufficient_balance_never_calls_gateway() {
    let mut poor = UserProfile::with_id("user_poor");
    poor.balance = 2;
    let store = seeded_store(&poor);
    let mut h = setup_with(MockGateway::default(), store).await;
    let before = h.store.raw();

    h.service.select_reader("sage").unwrap();
    h.service.select_reading_type("three_card").unwrap();
    let err = h.service.perform_reading().await.unwrap_err();

    assert!(matches!(
        err,
        ArcanaError::Precondition(PreconditionError::InsufficientBalance {
            required: 3,
            available: 2
        })
    ));
    assert_eq!(h.gateway.call_count(Operation::RequestReading), 0);
    assert_eq!(h.service.profile().balance, 2);
    assert_eq!(h.store.raw(), before);

    let notes = h.service.notifications().snapshot();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert!(notes[0].message.starts_with("Insufficient coins"));
}

#[tokio::test]
async fn test_missing_selection_warns_without_network() {
    let mut h = setup().await;
    h.service.select_reader("luna").unwrap();

    let err = h.service.perform_reading().await.unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(h.gateway.call_count(Operation::RequestReading), 0);

    let notes = h.service.notifications().snapshot();
    assert_eq!(notes[0].message, "Please select a reader and reading type");
    assert_eq!(notes[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_unknown_selection_is_rejected() {
    let mut h = setup().await;
    assert!(h.service.select_reader("nobody").is_err());
    assert!(h.service.select_reading_type("tea_leaves").is_err());
    assert!(h.service.selection().reader.is_none());
    assert!(h.service.selection().reading_type.is_none());
}

#[tokio::test]
async fn test_failed_reading_leaves_profile_untouched() {
    let gateway = MockGateway::default().failing(
        Operation::RequestReading,
        GatewayError::Service {
            status: 503,
            message: Some("The reader is meditating".to_string()),
        },
    );
    let mut h = setup_with(gateway, MemoryStore::new()).await;
    let before_raw = h.store.raw();
    let before_writes = h.store.write_count();

    h.service.select_reader("orion").unwrap();
    h.service.select_reading_type("single_card").unwrap();
    let err = h.service.perform_reading().await.unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert_eq!(h.service.profile().balance, 10);
    assert!(h.service.profile().reading_history.is_empty());
    assert_eq!(h.store.raw(), before_raw);
    assert_eq!(h.store.write_count(), before_writes);
    assert_eq!(h.service.current_page(), Page::Home);
    assert!(h.service.current_reading().is_none());

    let notes = h.service.notifications().snapshot();
    assert_eq!(notes.last().unwrap().message, "The reader is meditating");
    assert_eq!(notes.last().unwrap().severity, Severity::Error);
}

#[tokio::test]
async fn test_transport_failure_uses_generic_message() {
    let gateway = MockGateway::default().failing(
        Operation::RequestReading,
        GatewayError::Network("connection reset".to_string()),
    );
    let mut h = setup_with(gateway, MemoryStore::new()).await;

    h.service.select_reader("orion").unwrap();
    h.service.select_reading_type("single_card").unwrap();
    assert!(h.service.perform_reading().await.is_err());

    assert_eq!(
        messages(&h.service).last().unwrap(),
        "Error performing reading"
    );
}

#[tokio::test]
async fn test_reading_can_be_retried_after_failure() {
    let mut h = setup().await;
    h.gateway.set_failure(
        Operation::RequestReading,
        Some(GatewayError::Network("flaky".to_string())),
    );

    h.service.select_reader("luna").unwrap();
    h.service.select_reading_type("single_card").unwrap();
    assert!(h.service.perform_reading().await.is_err());

    h.gateway.set_failure(Operation::RequestReading, None);
    h.service.perform_reading().await.unwrap();

    assert_eq!(h.gateway.call_count(Operation::RequestReading), 2);
    assert_eq!(h.service.profile().balance, 9);
    assert_eq!(h.service.profile().reading_history.len(), 1);
}

#[tokio::test]
async fn test_purchase_replaces_balance_with_service_value() {
    let mut h = setup().await;
    h.gateway.set_server_balance(500);

    let receipt = h.service.purchase_coins("starter").await.unwrap();

    assert_eq!(receipt.coins_added, 50);
    assert_eq!(h.service.profile().balance, 550);
    assert_eq!(h.store.load().unwrap().unwrap().balance, 550);
    assert_eq!(h.gateway.purchases()[0].0, h.service.profile().id);

    let all = messages(&h.service);
    assert!(all.contains(&"Successfully purchased 50 coins!".to_string()));
    assert!(h.service.profile().has_achievement(Achievement::CoinCollector));
}

#[tokio::test]
async fn test_failed_purchase_keeps_balance() {
    let gateway = MockGateway::default().failing(
        Operation::PurchaseCoins,
        GatewayError::Service {
            status: 500,
            message: None,
        },
    );
    let mut h = setup_with(gateway, MemoryStore::new()).await;
    let before = h.store.raw();

    assert!(h.service.purchase_coins("oracle").await.is_err());
    assert_eq!(h.service.profile().balance, 10);
    assert_eq!(h.store.raw(), before);
    assert_eq!(messages(&h.service).last().unwrap(), "Error purchasing coins");
}

#[tokio::test]
async fn test_unknown_package_is_precondition_failure() {
    let mut h = setup().await;
    let err = h.service.purchase_coins("golden").await.unwrap_err();
    assert!(matches!(
        err,
        ArcanaError::Precondition(PreconditionError::UnknownPackage(_))
    ));
    assert_eq!(h.gateway.call_count(Operation::PurchaseCoins), 0);
}

#[tokio::test]
async fn test_quiz_end_to_end_uses_authoritative_score() {
    let gateway = MockGateway::new(MockConfig {
        quiz_score: Some(quiz_score(85.0, 42)),
        ..MockConfig::default()
    });
    let mut h = setup_with(gateway, MemoryStore::new()).await;

    let session = h.service.start_quiz().unwrap();
    assert_eq!(session.total(), 5);
    assert_eq!(h.service.current_page(), Page::Quiz);

    for (question_id, _) in CORRECT_ANSWERS {
        h.service.answer_question(question_id, 0).unwrap();
    }
    let outcome = h.service.submit_quiz().await.unwrap();

    let profile = h.service.profile();
    assert_eq!(profile.experience, 40);
    assert_eq!(profile.balance, 42);
    assert_eq!(profile.quiz_history.len(), 1);
    assert_eq!(profile.quiz_history[0].experience_earned, 40);
    assert_eq!(outcome.reward.experience, 40);
    assert_eq!(outcome.answers.len(), 5);
    assert!(outcome.level_up.is_none());

    assert!(h.service.quiz().is_none());
    assert_eq!(h.service.current_page(), Page::Home);
    assert!(messages(&h.service).contains(
        &"Quiz completed! Score: 4/5 (85.0%). You earned 8 coins and 40 XP!".to_string()
    ));

    let submitted = h.gateway.submissions();
    assert_eq!(submitted[0].answers.len(), 5);
    assert_eq!(submitted[0].user_id, h.service.profile().id);
}

#[tokio::test]
async fn test_quiz_submit_requires_every_answer() {
    let mut h = setup().await;
    h.service.start_quiz().unwrap();
    for (question_id, option) in &CORRECT_ANSWERS[..4] {
        h.service.answer_question(*question_id, *option).unwrap();
    }

    let err = h.service.submit_quiz().await.unwrap_err();
    assert!(matches!(
        err,
        ArcanaError::Precondition(PreconditionError::QuizIncomplete {
            answered: 4,
            total: 5
        })
    ));
    assert_eq!(h.gateway.call_count(Operation::SubmitQuiz), 0);
    assert!(h.service.quiz().is_some());
}

#[tokio::test]
async fn test_quiz_answers_are_last_write_wins() {
    let mut h = setup().await;
    h.service.start_quiz().unwrap();
    h.service.answer_question(1, 0).unwrap();
    h.service.answer_question(1, 2).unwrap();

    let session = h.service.quiz().unwrap();
    assert_eq!(session.answered(), 1);
    assert_eq!(session.answer_for(1), Some(2));

    assert!(h.service.answer_question(6, 0).is_err());
    assert!(h.service.answer_question(2, 4).is_err());
}

#[tokio::test]
async fn test_failed_quiz_submit_keeps_session_and_progress() {
    let gateway = MockGateway::default().failing(
        Operation::SubmitQuiz,
        GatewayError::Service {
            status: 400,
            message: Some("Quiz already submitted".to_string()),
        },
    );
    let mut h = setup_with(gateway, MemoryStore::new()).await;
    let before = h.store.raw();

    h.service.start_quiz().unwrap();
    for (question_id, option) in CORRECT_ANSWERS {
        h.service.answer_question(question_id, option).unwrap();
    }
    assert!(h.service.submit_quiz().await.is_err());

    assert_eq!(h.service.profile().experience, 0);
    assert!(h.service.profile().quiz_history.is_empty());
    assert!(h.service.quiz().unwrap().is_complete());
    assert_eq!(h.service.current_page(), Page::Quiz);
    assert_eq!(h.store.raw(), before);
    assert_eq!(messages(&h.service).last().unwrap(), "Quiz already submitted");
}

#[tokio::test]
async fn test_perfect_quiz_levels_up_and_awards() {
    let mut seasoned = UserProfile::with_id("user_seasoned");
    seasoned.experience = 60;
    let mut h = setup_with(MockGateway::default(), seeded_store(&seasoned)).await;

    h.service.start_quiz().unwrap();
    for (question_id, option) in CORRECT_ANSWERS {
        h.service.answer_question(question_id, option).unwrap();
    }
    let outcome = h.service.submit_quiz().await.unwrap();

    assert_eq!(outcome.score.percentage, 100.0);
    assert!(outcome.answers.iter().all(|answer| answer.correct));
    assert_eq!(outcome.level_up, Some(2));

    let profile = h.service.profile();
    assert_eq!(profile.experience, 110);
    assert_eq!(profile.level, 2);
    assert_eq!(profile.balance, 20);
    assert!(profile.has_achievement(Achievement::PerfectQuiz));

    let all = messages(&h.service);
    assert!(all.contains(&"Level up! You are now level 2".to_string()));
    assert!(all.iter().any(|m| m.starts_with("Achievement unlocked: Tarot Master")));
}

#[tokio::test]
async fn test_level_tracks_experience_across_flows() {
    let mut h = setup().await;

    for _ in 0..3 {
        h.service.start_quiz().unwrap();
        for (question_id, option) in CORRECT_ANSWERS {
            h.service.answer_question(question_id, option).unwrap();
        }
        h.service.submit_quiz().await.unwrap();

        let profile = h.service.profile();
        assert_eq!(profile.level, level_for(profile.experience));
    }

    h.service.select_reader("luna").unwrap();
    h.service.select_reading_type("single_card").unwrap();
    h.service.perform_reading().await.unwrap();

    let saved = h.store.load().unwrap().unwrap();
    assert_eq!(saved.experience, 150);
    assert_eq!(saved.level, level_for(saved.experience));
}

#[tokio::test]
async fn test_card_search_through_service() {
    let mut h = setup().await;

    let first = h.service.search_cards("").to_vec();
    let second = h.service.search_cards("").to_vec();
    assert_eq!(first.len(), 20);
    assert_eq!(first, second);
    assert_eq!(first, h.service.catalog().cards.first(20));

    let hits = h.service.search_cards("HOPE").to_vec();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "The Star");
    assert_eq!(h.service.selection().search_query, "HOPE");
}

#[tokio::test]
async fn test_sound_respects_preference_and_failures_are_ignored() {
    let mut quiet = UserProfile::with_id("user_quiet");
    quiet.preferences.sound_enabled = false;
    let mut h = setup_with(MockGateway::default(), seeded_store(&quiet)).await;

    h.service.select_reader("luna").unwrap();
    h.service.select_reading_type("single_card").unwrap();
    h.service.perform_reading().await.unwrap();
    assert!(h.effects.played().is_empty());

    let broken = RecordingEffects::failing();
    let mut service = ArcanaService::new(
        Arc::new(MockGateway::default()),
        Arc::new(MemoryStore::new()),
        DEFAULT_TTL,
    )
    .unwrap()
    .with_effects(Arc::new(broken.clone()));
    service.start().await.unwrap();
    service.select_reader("luna").unwrap();
    service.select_reading_type("single_card").unwrap();
    service.perform_reading().await.unwrap();

    assert_eq!(broken.played(), vec![SoundCue::Ambient, SoundCue::CardFlip]);
}

#[tokio::test]
async fn test_reading_flow_events() {
    let mut h = setup().await;
    let mut events = h.service.subscribe();

    h.service.select_reader("sage").unwrap();
    h.service.select_reading_type("single_card").unwrap();
    h.service.perform_reading().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    let started = received
        .iter()
        .position(|e| *e == Event::FlowStarted { flow: Flow::Reading })
        .unwrap();
    let finished = received
        .iter()
        .position(|e| {
            *e == Event::FlowFinished {
                flow: Flow::Reading,
                success: true,
            }
        })
        .unwrap();
    assert!(started < finished);
    assert!(received.contains(&Event::PageChanged {
        from: Page::Home,
        to: Page::ReadingResult,
    }));
    assert!(received
        .iter()
        .any(|e| matches!(e, Event::ProfileUpdated { balance: 9, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_notifications_expire_independently() {
    let mut h = setup().await;

    h.service.select_reader("luna").unwrap();
    let warning = h.service.perform_reading().await.unwrap_err();
    assert!(matches!(warning, ArcanaError::Precondition(_)));
    let first = h.service.notifications().snapshot()[0].id;

    tokio::time::sleep(Duration::from_secs(2)).await;
    h.service.purchase_coins("starter").await.unwrap();
    assert!(h.service.notifications().contains(first));

    tokio::time::sleep(Duration::from_millis(3001)).await;
    tokio::task::yield_now().await;
    assert!(!h.service.notifications().contains(first));
    assert!(!h.service.notifications().is_empty());

    tokio::time::sleep(DEFAULT_TTL).await;
    tokio::task::yield_now().await;
    assert!(h.service.notifications().is_empty());
}

#[tokio::test]
async fn test_dismiss_notification() {
    let mut h = setup().await;
    assert!(h.service.navigate(Page::ReadingResult).is_err());

    let id = h.service.notifications().snapshot()[0].id;
    assert!(h.service.dismiss_notification(id));
    assert!(!h.service.dismiss_notification(id));
    assert!(h.service.notifications().is_empty());
}

#[tokio::test]
async fn test_profile_survives_restart_with_file_store() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());

    let first_id = {
        let mut service = ArcanaService::new(
            Arc::new(MockGateway::default()),
            Arc::new(store.clone()),
            DEFAULT_TTL,
        )
        .unwrap();
        service.start().await.unwrap();
        service.select_reader("luna").unwrap();
        service.select_reading_type("three_card").unwrap();
        service.perform_reading().await.unwrap();
        service.toggle_sound();
        service.profile().id.clone()
    };

    let service = ArcanaService::new(
        Arc::new(MockGateway::default()),
        Arc::new(store),
        DEFAULT_TTL,
    )
    .unwrap();
    let profile = service.profile();
    assert_eq!(profile.id, first_id);
    assert_eq!(profile.balance, 7);
    assert_eq!(profile.reading_history.len(), 1);
    assert!(!profile.preferences.sound_enabled);
}
