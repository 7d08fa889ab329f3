//! Journey: Persistence Workflow
//!
//! Reviews written through one store handle must be visible, unchanged,
//! through another opened on the same file.

use chrono::{Duration, Utc};
use retain_core::{
    DeckFilter, Rating, RecordStore, ReviewItem, Scheduler, SessionController, StorageError,
};
use retain_e2e_tests::{TestDataFactory, TestDatabaseManager};

#[tokio::test]
async fn test_reviews_survive_reopen() {
    let db = TestDatabaseManager::new_temp();
    let ids = db.seed_items(2, "spanish");
    let now = Utc::now();

    let session = SessionController::start_at(
        db.shared(),
        Scheduler::default(),
        DeckFilter::Deck("spanish".into()),
        now,
    )
    .await
    .unwrap();
    session.reveal().unwrap();
    session
        .commit_at(Rating::Good, Some("perro sounds like pair-o"), now)
        .await
        .unwrap();
    session.reveal().unwrap();
    session.commit_at(Rating::Again, None, now).await.unwrap();

    let reopened = db.reopen();
    let first = reopened.get_item(&ids[0]).unwrap().unwrap();
    assert_eq!(first.state.quality_history.len(), 1);
    assert_eq!(first.state.quality_history[0].quality, 4);
    assert_eq!(first.state.current_learning_step, 1);
    assert_eq!(first.state.note.as_deref(), Some("perro sounds like pair-o"));
    assert_eq!(first.state.last_reviewed, Some(now));
    assert_eq!(first, db.item(&ids[0]));

    let second = reopened.get_item(&ids[1]).unwrap().unwrap();
    assert_eq!(second.state.quality_history[0].quality, 1);
    assert!(second.state.is_learning);

    // Both items sit on the first ladder steps, so nothing is due at `now`
    assert!(reopened
        .due_items(&DeckFilter::All, now)
        .unwrap()
        .is_empty());
    assert_eq!(
        reopened
            .due_items(&DeckFilter::All, now + Duration::minutes(30))
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_history_accumulates_across_sessions() {
    let db = TestDatabaseManager::new_temp();
    let ids = db.seed_items(1, "bio");
    let mut now = Utc::now();

    for rating in [Rating::Good, Rating::Good, Rating::Easy, Rating::Hard] {
        let session =
            SessionController::start_at(db.shared(), Scheduler::default(), DeckFilter::All, now)
                .await
                .unwrap();
        session.reveal().unwrap();
        let outcome = session.commit_at(rating, None, now).await.unwrap();
        assert!(outcome.session_complete);
        now = outcome.state.next_review;
    }

    let stored = db.reopen().get_item(&ids[0]).unwrap().unwrap();
    let qualities: Vec<u8> = stored
        .state
        .quality_history
        .iter()
        .map(|r| r.quality)
        .collect();
    assert_eq!(qualities, vec![4, 4, 5, 2]);
    assert!(stored.state.is_learning);
    assert_eq!(stored.state.repetitions, 0);
}

#[tokio::test]
async fn test_deck_filtering() {
    let db = TestDatabaseManager::new_temp();
    let decks = db.seed_decks(&["bio", "chem", "phys"], 3);
    let now = Utc::now();

    let chem = db
        .store
        .due_items(&DeckFilter::Deck("chem".into()), now)
        .unwrap();
    let mut chem_ids: Vec<_> = chem.iter().map(|i| i.id.clone()).collect();
    let mut expected = decks["chem"].clone();
    chem_ids.sort();
    expected.sort();
    assert_eq!(chem_ids, expected);

    assert_eq!(db.store.due_items(&DeckFilter::All, now).unwrap().len(), 9);
    assert!(db
        .store
        .due_items(&DeckFilter::Deck("history".into()), now)
        .unwrap()
        .is_empty());

    let session = SessionController::start_at(
        db.shared(),
        Scheduler::default(),
        DeckFilter::Deck("phys".into()),
        now,
    )
    .await
    .unwrap();
    assert_eq!(session.progress(), (0, 3));
}

#[tokio::test]
async fn test_stale_write_is_rejected() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let item = TestDataFactory::mature_item("bio", 2.2, 3, 8.0, now);
    db.insert_all(std::slice::from_ref(&item));

    let scheduler = Scheduler::default();
    let fresh = scheduler.apply_review(&item.state, Rating::Good, None, now);
    db.store
        .put(&item.id, &fresh, item.state.last_reviewed)
        .await
        .unwrap();

    // Computed from the same read, written after the first one landed
    let stale = scheduler.apply_review(&item.state, Rating::Again, None, now);
    let err = db
        .store
        .put(&item.id, &stale, item.state.last_reviewed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(db.item(&item.id).state, fresh);
}

#[tokio::test]
async fn test_unknown_item() {
    let db = TestDatabaseManager::new_temp();
    let state = ReviewItem::new("bio", "q", "a", Utc::now()).state;

    assert!(db.store.get("missing").await.unwrap().is_none());
    let err = db.store.put("missing", &state, None).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_insert_keeps_original() {
    let db = TestDatabaseManager::new_temp();
    let item = TestDataFactory::new_item("bio", "Mitochondria", Utc::now());
    db.store.insert(&item).await.unwrap();

    let mut copy = item.clone();
    copy.front = "Overwritten".to_string();
    assert!(db.store.insert(&copy).await.is_err());
    assert_eq!(db.item(&item.id).front, "Mitochondria");
    assert_eq!(db.item_count(), 1);
}

#[test]
fn test_export_json_round_trip() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let scenario = TestDataFactory::create_scheduling_scenario(now);
    db.insert_all(&scenario.items);

    let exported = serde_json::to_string(&db.all_items()).unwrap();
    let imported: Vec<ReviewItem> = serde_json::from_str(&exported).unwrap();
    assert_eq!(imported.len(), 4);

    let other = TestDatabaseManager::new_temp();
    other.insert_all(&imported);
    for item in &scenario.items {
        let copy = other.item(&item.id);
        assert_eq!(copy.front, item.front);
        assert_eq!(copy.state.next_review, item.state.next_review);
        assert_eq!(copy.state.last_reviewed, item.state.last_reviewed);
        assert_eq!(copy.state.repetitions, item.state.repetitions);
        assert!((copy.state.interval - item.state.interval).abs() < 1e-9);
        assert!((copy.state.easiness - item.state.easiness).abs() < 1e-9);
        assert_eq!(
            copy.state.quality_history.len(),
            item.state.quality_history.len()
        );
    }

    let value: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert!(value[0]["state"]["qualityHistory"].is_array());
    assert!(value[0]["deckId"].is_string());
}
