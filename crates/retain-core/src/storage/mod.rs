//! Storage Module
//!
//! Record store collaborator for review items:
//! - [`RecordStore`] trait consumed by the session controller
//! - SQLite implementation with versioned migrations
//! - In-memory implementation for tests and throwaway sessions
//!
//! Every write of an item is a single atomic replacement of its scheduling
//! fields plus an append to its quality history.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use migrations::{apply_migrations, get_current_version, Migration, MIGRATIONS};
pub use sqlite::{SqliteStore, DATABASE_FILE};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::memory::{DeckFilter, ItemMemoryState, ReviewItem};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Item was modified since it was read
    #[error("Item was reviewed elsewhere: {0}")]
    Conflict(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Store temporarily cannot accept writes
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// RECORD STORE
// ============================================================================

/// Key-indexed persistence for review items.
///
/// Implementations need not be transactional across items, but a single
/// [`RecordStore::put`] must be all-or-nothing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch an item by id
    async fn get(&self, id: &str) -> Result<Option<ReviewItem>>;

    /// Replace an item's scheduling state and append any new history records.
    ///
    /// `expected_last_reviewed` is the `last_reviewed` value the caller read
    /// before computing `state`; the write fails with
    /// [`StorageError::Conflict`] if the stored value has moved on since.
    async fn put(
        &self,
        id: &str,
        state: &ItemMemoryState,
        expected_last_reviewed: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Items in the deck that are due at `now`
    async fn query_due(&self, deck: &DeckFilter, now: DateTime<Utc>) -> Result<Vec<ReviewItem>>;

    /// Add a new item
    async fn insert(&self, item: &ReviewItem) -> Result<()>;

    /// Every item in the deck
    async fn list(&self, deck: &DeckFilter) -> Result<Vec<ReviewItem>>;
}
