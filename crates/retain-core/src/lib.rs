//! # Retain Core
//!
//! Spaced-repetition engine for question/answer flashcards:
//!
//! - **Learning-step scheduler**: SM-2 family. New and lapsed items climb a
//!   short ladder of minute-scale steps, graduated items grow by a per-item
//!   easiness factor
//! - **Time estimates**: "10 minutes", "3 weeks" for every interval
//! - **Review queue**: due items, learning phase first, fixed order per session
//! - **Session controller**: reveal, preview, commit with a single write in
//!   flight, completion hooks and reflection capture
//! - **Record stores**: SQLite with versioned migrations, or in memory
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use retain_core::{format_estimate, ItemMemoryState, Rating, Scheduler};
//!
//! let scheduler = Scheduler::default();
//! let now = Utc::now();
//! let state = ItemMemoryState::new(now);
//!
//! let next = scheduler.apply_review(&state, Rating::Good, None, now);
//! assert!(next.is_learning);
//! assert_eq!(format_estimate(next.interval), "10 minutes");
//! ```
//!
//! A full session against a store:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use retain_core::{DeckFilter, Rating, Scheduler, SessionController, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::new(None)?);
//! let session = SessionController::start(store, Scheduler::default(), DeckFilter::All).await?;
//! while let Some(item) = session.current_item() {
//!     println!("{}", item.front);
//!     session.reveal()?;
//!     session.commit(Rating::Good, None).await?;
//! }
//! session.reflect("")?;
//! let summary = session.finish()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Bundle SQLite
//! - `encryption`: SQLCipher, keyed by `RETAIN_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod estimate;
pub mod memory;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Item model
pub use memory::{
    CollectionStats, DeckFilter, ItemMemoryState, QualityRecord, ReviewItem, DEFAULT_EASINESS,
    MIN_EASINESS,
};

// Scheduler
pub use scheduler::{
    LearningLadder, PreviewResults, Rating, ReviewPreview, Scheduler, SchedulerError,
};

// Estimates
pub use estimate::{format_estimate, EstimateUnit, TimeEstimate};

// Queue
pub use queue::ReviewQueue;

// Sessions
pub use session::{
    CommitOutcome, RatingCounts, SessionController, SessionError, SessionEvent, SessionState,
    SessionSummary,
};

// Storage
pub use storage::{MemoryStore, RecordStore, Result, SqliteStore, StorageError};

// Configuration
pub use config::{ConfigError, RetainConfig};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        format_estimate, DeckFilter, ItemMemoryState, MemoryStore, Rating, RecordStore,
        RetainConfig, ReviewItem, ReviewQueue, Scheduler, SessionController, SessionError,
        SessionState, SqliteStore, StorageError,
    };
}
