//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded databases with test items
//! - Snapshots for detecting which items a test changed
//! - Reopening the same file to check durability

use chrono::{Duration, Utc};
use retain_core::{DeckFilter, ReviewItem, SqliteStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let ids = db.seed_items(5, "spanish");
/// let session = SessionController::start(db.shared(), Scheduler::default(), DeckFilter::All).await?;
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The store instance
    pub store: Arc<SqliteStore>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    /// Items as of the last snapshot
    snapshot: Option<HashMap<String, ReviewItem>>,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_retain.db");

        let store = SqliteStore::new(Some(db_path.clone())).expect("Failed to create test store");

        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
            db_path,
            snapshot: None,
        }
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        let store = SqliteStore::new(Some(path.clone())).expect("Failed to create test store");

        Self {
            store: Arc::new(store),
            _temp_dir: None,
            db_path: path,
            snapshot: None,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Store handle for session controllers
    pub fn shared(&self) -> Arc<SqliteStore> {
        Arc::clone(&self.store)
    }

    /// All items in the database
    pub fn all_items(&self) -> Vec<ReviewItem> {
        self.store.list_items(&DeckFilter::All).unwrap_or_default()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Get the number of items in the database
    pub fn item_count(&self) -> usize {
        self.all_items().len()
    }

    /// Fetch an item, panicking if it is missing
    pub fn item(&self, id: &str) -> ReviewItem {
        self.store
            .get_item(id)
            .expect("Failed to read item")
            .expect("Item not found")
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Seed the database with new items in one deck, all due now
    pub fn seed_items(&self, count: usize, deck: &str) -> Vec<String> {
        let now = Utc::now();
        let mut ids = Vec::with_capacity(count);

        for i in 0..count {
            // Stagger creation so due order is deterministic
            let created = now - Duration::minutes((count - i) as i64);
            let item = ReviewItem::new(
                deck,
                format!("Question {}", i),
                format!("Answer {}", i),
                created,
            );
            if self.store.insert_item(&item).is_ok() {
                ids.push(item.id);
            }
        }

        ids
    }

    /// Seed several decks with the same number of items each
    pub fn seed_decks(&self, decks: &[&str], per_deck: usize) -> HashMap<String, Vec<String>> {
        decks
            .iter()
            .map(|deck| (deck.to_string(), self.seed_items(per_deck, deck)))
            .collect()
    }

    /// Insert prepared items
    pub fn insert_all(&self, items: &[ReviewItem]) {
        for item in items {
            self.store
                .insert_item(item)
                .expect("Failed to insert test item");
        }
    }

    // ========================================================================
    // SNAPSHOT
    // ========================================================================

    /// Take a snapshot of current database state
    pub fn take_snapshot(&mut self) {
        let items = self
            .all_items()
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        self.snapshot = Some(items);
    }

    /// Ids of items whose state differs from the snapshot
    pub fn changed_since_snapshot(&self) -> Vec<String> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        let mut changed: Vec<String> = self
            .all_items()
            .into_iter()
            .filter(|item| snapshot.get(&item.id) != Some(item))
            .map(|item| item.id)
            .collect();
        changed.sort();
        changed
    }

    /// Check if a snapshot exists
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Open a second store on the same file
    pub fn reopen(&self) -> SqliteStore {
        SqliteStore::new(Some(self.db_path.clone())).expect("Failed to reopen store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_starts_empty() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty());
        assert!(db.path().exists());
    }

    #[test]
    fn test_seeding() {
        let db = TestDatabaseManager::new_temp();
        let ids = db.seed_items(5, "bio");
        assert_eq!(ids.len(), 5);
        assert_eq!(db.item_count(), 5);

        let decks = db.seed_decks(&["chem", "phys"], 2);
        assert_eq!(decks["chem"].len(), 2);
        assert_eq!(db.item_count(), 9);
    }

    #[test]
    fn test_snapshot_starts_clean() {
        let mut db = TestDatabaseManager::new_temp();
        db.seed_items(3, "bio");
        assert!(!db.has_snapshot());
        db.take_snapshot();
        assert!(db.changed_since_snapshot().is_empty());
    }
}
