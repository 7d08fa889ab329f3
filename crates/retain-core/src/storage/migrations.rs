//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: review items and quality history",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Review notes and per-deck due index",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS review_items (
    id TEXT PRIMARY KEY,
    deck_id TEXT NOT NULL,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    -- Scheduling state
    easiness REAL NOT NULL DEFAULT 2.5,
    repetitions INTEGER NOT NULL DEFAULT 0,
    interval_days REAL NOT NULL DEFAULT 0.0,
    is_learning INTEGER NOT NULL DEFAULT 1,
    learning_step INTEGER NOT NULL DEFAULT 0,
    last_reviewed TEXT,
    next_review TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_next_review ON review_items(next_review);
CREATE INDEX IF NOT EXISTS idx_items_deck ON review_items(deck_id);

-- Append-only review log, one row per rating
CREATE TABLE IF NOT EXISTS quality_history (
    item_id TEXT NOT NULL REFERENCES review_items(id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    reviewed_at TEXT NOT NULL,
    quality INTEGER NOT NULL,
    resulting_interval REAL NOT NULL,
    resulting_easiness REAL NOT NULL,
    was_learning_after INTEGER NOT NULL,
    PRIMARY KEY (item_id, seq)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Notes attached at review time, deck-scoped due lookups
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE review_items ADD COLUMN note TEXT;

CREATE INDEX IF NOT EXISTS idx_items_deck_next_review ON review_items(deck_id, next_review);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
