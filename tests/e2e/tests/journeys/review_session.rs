//! Journey: Review Session
//!
//! A learner opens a session against a real SQLite store, works through the
//! queue, and closes it with a reflection.

use chrono::Utc;
use retain_core::{
    DeckFilter, Rating, Scheduler, SessionController, SessionError, SessionEvent, SessionState,
    StorageError,
};
use retain_e2e_tests::{TestDataFactory, TestDatabaseManager};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

#[tokio::test]
async fn test_complete_session_persists_every_review() {
    let mut db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let scenario = TestDataFactory::create_scheduling_scenario(now);
    db.insert_all(&scenario.items);
    db.take_snapshot();

    let session = SessionController::start_at(
        db.shared(),
        Scheduler::default(),
        DeckFilter::Deck("mixed".into()),
        now,
    )
    .await
    .unwrap();
    assert_eq!(session.progress(), (0, 4));

    let mut order = Vec::new();
    while let Some(item) = session.current_item() {
        order.push(item.id.clone());
        session.reveal().unwrap();
        let previews = session.preview_all_at(now).unwrap();
        let outcome = session.commit_at(Rating::Good, None, now).await.unwrap();
        assert_eq!(outcome.estimate, previews.good.estimate);
    }

    assert_eq!(order[0], scenario.id("relearning"));
    assert_eq!(order[3], scenario.id("mature"));
    assert_eq!(session.state(), SessionState::SessionComplete);

    let mut changed = db.changed_since_snapshot();
    let mut expected = order.clone();
    changed.sort();
    expected.sort();
    assert_eq!(changed, expected);

    for item in &scenario.items {
        let stored = db.item(&item.id);
        assert_eq!(
            stored.state.quality_history.len(),
            item.state.quality_history.len() + 1
        );
        assert_eq!(stored.state.last_reviewed, Some(now));
    }

    session.reflect("The relearning card needs a better mnemonic").unwrap();
    let summary = session.finish().unwrap();
    assert_eq!(summary.reviewed, 4);
    assert_eq!(summary.ratings.good, 4);
    // "learning" reaches the end of the ladder
    assert_eq!(summary.graduated, 1);
    assert_eq!(summary.lapsed, 0);
}

#[tokio::test]
async fn test_abandoned_session_leaves_rest_due() {
    let db = TestDatabaseManager::new_temp();
    let ids = db.seed_items(3, "spanish");
    let now = Utc::now();

    {
        let session = SessionController::start_at(
            db.shared(),
            Scheduler::default(),
            DeckFilter::Deck("spanish".into()),
            now,
        )
        .await
        .unwrap();
        session.reveal().unwrap();
        session.commit_at(Rating::Good, None, now).await.unwrap();
        session.reveal().unwrap();
        // Learner walks away with the answer showing
    }

    let resumed = SessionController::start_at(
        db.shared(),
        Scheduler::default(),
        DeckFilter::Deck("spanish".into()),
        now,
    )
    .await
    .unwrap();
    assert_eq!(resumed.progress(), (0, 2));
    assert_eq!(resumed.current_item().unwrap().id, ids[1]);
    assert_eq!(db.item(&ids[1]).state.quality_history.len(), 0);
}

#[tokio::test]
async fn test_second_session_on_same_item_is_rejected() {
    let mut db = TestDatabaseManager::new_temp();
    let ids = db.seed_items(1, "bio");
    let now = Utc::now();

    let first = SessionController::start_at(db.shared(), Scheduler::default(), DeckFilter::All, now)
        .await
        .unwrap();
    let second =
        SessionController::start_at(db.shared(), Scheduler::default(), DeckFilter::All, now)
            .await
            .unwrap();

    first.reveal().unwrap();
    second.reveal().unwrap();
    let winner = first.commit_at(Rating::Easy, None, now).await.unwrap();
    db.take_snapshot();

    let err = second
        .commit_at(Rating::Again, None, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Persistence(StorageError::Conflict(_))
    ));
    assert_eq!(second.state(), SessionState::AwaitingRating);
    assert!(db.changed_since_snapshot().is_empty());
    assert_eq!(db.item(&ids[0]).state, winner.state);
}

#[tokio::test]
async fn test_empty_deck_completes_immediately() {
    let db = TestDatabaseManager::new_temp();
    db.seed_items(2, "bio");

    let session = SessionController::start(
        db.shared(),
        Scheduler::default(),
        DeckFilter::Deck("chemistry".into()),
    )
    .await
    .unwrap();
    assert_eq!(session.state(), SessionState::SessionComplete);
    assert!(matches!(
        session.finish(),
        Err(SessionError::ReflectionPending)
    ));
    session.reflect("").unwrap();
    assert_eq!(session.finish().unwrap().total, 0);
}

#[tokio::test]
async fn test_events_and_completion_hook() {
    let db = TestDatabaseManager::new_temp();
    db.seed_items(2, "bio");
    let now = Utc::now();

    let (tx, mut rx) = broadcast::channel(32);
    let session = SessionController::start_with_events(
        db.shared(),
        Scheduler::default(),
        DeckFilter::All,
        tx,
        now,
    )
    .await
    .unwrap();

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    session.on_session_complete(move |summary| {
        sink.lock().unwrap().push(summary.reviewed);
    });

    for key in ['1', '4'] {
        session.reveal().unwrap();
        session.commit_key(key, Some("typed note")).await.unwrap();
    }
    assert_eq!(*captured.lock().unwrap(), vec![2]);

    let mut committed = Vec::new();
    let mut completed = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            SessionEvent::ReviewCommitted { rating, .. } => committed.push(rating),
            SessionEvent::SessionCompleted { summary, .. } => completed = Some(summary),
            _ => {}
        }
    }
    assert_eq!(committed, vec![Rating::Again, Rating::Easy]);
    let summary = completed.unwrap();
    assert_eq!(summary.ratings.again, 1);
    assert_eq!(summary.ratings.easy, 1);

    // Notes typed with the key are persisted
    let notes: Vec<_> = db
        .all_items()
        .into_iter()
        .filter_map(|item| item.state.note)
        .collect();
    assert_eq!(notes, vec!["typed note", "typed note"]);
}
