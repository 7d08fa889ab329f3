//! SQLite Storage Implementation
//!
//! Durable record store for review items and their quality history.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

use super::{RecordStore, Result, StorageError};
use crate::memory::{DeckFilter, ItemMemoryState, QualityRecord, ReviewItem};
use crate::scheduler::latest_due;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "retain.db";

/// SQLite-backed record store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making the store `Send + Sync` so sessions can
/// share an `Arc<SqliteStore>`.
pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("RETAIN_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA temp_store = MEMORY;",
        )?;

        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "retain", "retain").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join(DATABASE_FILE))
    }

    /// Open (or create) a store. `None` uses [`SqliteStore::default_path`].
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => {
                if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                p
            }
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!(path = %path.display(), applied, "Database schema upgraded");
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // ========================================================================
    // ITEMS
    // ========================================================================

    /// Add a new item with its current state and history
    pub fn insert_item(&self, item: &ReviewItem) -> Result<()> {
        check_storable(&item.state)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;
        let state = &item.state;

        tx.execute(
            "INSERT INTO review_items (
                id, deck_id, front, back, created_at, updated_at,
                easiness, repetitions, interval_days, is_learning, learning_step,
                last_reviewed, next_review, note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                item.id,
                item.deck_id,
                item.front,
                item.back,
                format_timestamp(&item.created_at),
                format_timestamp(&item.created_at),
                state.easiness,
                state.repetitions,
                state.interval,
                state.is_learning,
                state.current_learning_step as i64,
                state.last_reviewed.as_ref().map(format_timestamp),
                format_timestamp(&state.next_review),
                state.note,
            ],
        )?;
        Self::append_history(&tx, &item.id, &state.quality_history, 0)?;
        tx.commit()?;

        tracing::debug!(id = %item.id, deck = %item.deck_id, "Item inserted");
        Ok(())
    }

    /// Get an item by ID
    pub fn get_item(&self, id: &str) -> Result<Option<ReviewItem>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let item = reader
            .query_row(
                "SELECT * FROM review_items WHERE id = ?1",
                params![id],
                |row| Self::row_to_item(row),
            )
            .optional()?;

        match item {
            Some(mut item) => {
                item.state.quality_history = Self::load_history(&reader, &item.id)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Atomically replace an item's scheduling state and append new history rows
    pub fn update_state(
        &self,
        id: &str,
        state: &ItemMemoryState,
        expected_last_reviewed: Option<DateTime<Utc>>,
    ) -> Result<()> {
        check_storable(state)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;

        let stored: Option<Option<String>> = tx
            .query_row(
                "SELECT last_reviewed FROM review_items WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let stored = match stored {
            Some(value) => value
                .map(|s| parse_timestamp(&s, "last_reviewed"))
                .transpose()?,
            None => return Err(StorageError::NotFound(id.to_string())),
        };
        if stored != expected_last_reviewed {
            tracing::warn!(id, "Rejecting stale write: item was reviewed since it was read");
            return Err(StorageError::Conflict(id.to_string()));
        }

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM quality_history WHERE item_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let existing = existing as usize;
        if existing > state.quality_history.len() {
            return Err(StorageError::Conflict(id.to_string()));
        }

        tx.execute(
            "UPDATE review_items SET
                easiness = ?1,
                repetitions = ?2,
                interval_days = ?3,
                is_learning = ?4,
                learning_step = ?5,
                last_reviewed = ?6,
                next_review = ?7,
                note = ?8,
                updated_at = ?9
            WHERE id = ?10",
            params![
                state.easiness,
                state.repetitions,
                state.interval,
                state.is_learning,
                state.current_learning_step as i64,
                state.last_reviewed.as_ref().map(format_timestamp),
                format_timestamp(&state.next_review),
                state.note,
                format_timestamp(&Utc::now()),
                id,
            ],
        )?;
        Self::append_history(&tx, id, &state.quality_history, existing)?;
        tx.commit()?;

        Ok(())
    }

    /// Items due at `now`, oldest due first
    pub fn due_items(&self, deck: &DeckFilter, now: DateTime<Utc>) -> Result<Vec<ReviewItem>> {
        let now = format_timestamp(&now);
        match deck {
            DeckFilter::All => self.query_items(
                "SELECT * FROM review_items WHERE next_review <= ?1 ORDER BY next_review ASC",
                params![now],
            ),
            DeckFilter::Deck(deck_id) => self.query_items(
                "SELECT * FROM review_items
                 WHERE deck_id = ?1 AND next_review <= ?2
                 ORDER BY next_review ASC",
                params![deck_id, now],
            ),
        }
    }

    /// Every item in the deck, oldest first
    pub fn list_items(&self, deck: &DeckFilter) -> Result<Vec<ReviewItem>> {
        match deck {
            DeckFilter::All => self.query_items(
                "SELECT * FROM review_items ORDER BY created_at ASC",
                params![],
            ),
            DeckFilter::Deck(deck_id) => self.query_items(
                "SELECT * FROM review_items WHERE deck_id = ?1 ORDER BY created_at ASC",
                params![deck_id],
            ),
        }
    }

    fn query_items(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<ReviewItem>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(sql)?;
        let rows = stmt.query_map(params, |row| Self::row_to_item(row))?;

        let mut result = Vec::new();
        for row in rows {
            let mut item = row?;
            item.state.quality_history = Self::load_history(&reader, &item.id)?;
            result.push(item);
        }
        Ok(result)
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    fn append_history(
        conn: &Connection,
        id: &str,
        history: &[QualityRecord],
        skip: usize,
    ) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO quality_history (
                item_id, seq, reviewed_at, quality,
                resulting_interval, resulting_easiness, was_learning_after
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (seq, record) in history.iter().enumerate().skip(skip) {
            stmt.execute(params![
                id,
                seq as i64,
                format_timestamp(&record.timestamp),
                record.quality,
                record.resulting_interval,
                record.resulting_easiness,
                record.was_learning_after,
            ])?;
        }
        Ok(())
    }

    fn load_history(conn: &Connection, id: &str) -> Result<Vec<QualityRecord>> {
        let mut stmt = conn.prepare(
            "SELECT reviewed_at, quality, resulting_interval, resulting_easiness, was_learning_after
             FROM quality_history WHERE item_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            let reviewed_at: String = row.get(0)?;
            Ok(QualityRecord {
                timestamp: parse_timestamp(&reviewed_at, "reviewed_at")?,
                quality: row.get(1)?,
                resulting_interval: row.get(2)?,
                resulting_easiness: row.get(3)?,
                was_learning_after: row.get(4)?,
            })
        })?;

        let mut history = Vec::new();
        for record in rows {
            history.push(record?);
        }
        Ok(history)
    }

    /// Convert a row to ReviewItem (history loaded separately)
    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<ReviewItem> {
        let created_at: String = row.get("created_at")?;
        let next_review: String = row.get("next_review")?;
        let last_reviewed: Option<String> = row.get("last_reviewed")?;
        let learning_step: i64 = row.get("learning_step")?;

        Ok(ReviewItem {
            id: row.get("id")?,
            deck_id: row.get("deck_id")?,
            front: row.get("front")?,
            back: row.get("back")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            state: ItemMemoryState {
                easiness: row.get("easiness")?,
                repetitions: row.get("repetitions")?,
                interval: row.get("interval_days")?,
                is_learning: row.get("is_learning")?,
                current_learning_step: learning_step.max(0) as usize,
                last_reviewed: last_reviewed
                    .map(|s| parse_timestamp(&s, "last_reviewed"))
                    .transpose()?,
                next_review: parse_timestamp(&next_review, "next_review")?,
                quality_history: Vec::new(),
                note: row.get("note")?,
            },
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<ReviewItem>> {
        self.get_item(id)
    }

    async fn put(
        &self,
        id: &str,
        state: &ItemMemoryState,
        expected_last_reviewed: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.update_state(id, state, expected_last_reviewed)
    }

    async fn query_due(&self, deck: &DeckFilter, now: DateTime<Utc>) -> Result<Vec<ReviewItem>> {
        self.due_items(deck, now)
    }

    async fn insert(&self, item: &ReviewItem) -> Result<()> {
        self.insert_item(item)
    }

    async fn list(&self, deck: &DeckFilter) -> Result<Vec<ReviewItem>> {
        self.list_items(deck)
    }
}

/// Due dates past year 9999 would be written with a year sign and break
/// both text ordering and parsing for the whole table
fn check_storable(state: &ItemMemoryState) -> Result<()> {
    if state.next_review > latest_due() {
        return Err(StorageError::InvalidTimestamp(format!(
            "next_review {} is past {}",
            state.next_review,
            latest_due()
        )));
    }
    Ok(())
}

/// Fixed-width RFC3339 so text comparison in SQL matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse RFC3339 timestamp
fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                )),
            )
        })
}

// ============================================================================
// TESTS
// ============================================================================
