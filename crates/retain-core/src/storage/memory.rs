//! In-memory record store
//!
//! Same contract as [`super::SqliteStore`] without the disk. Useful for tests
//! and throwaway sessions; it can also be told to pause or fail writes so
//! callers can exercise their error and concurrency paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

use super::{RecordStore, Result, StorageError};
use crate::memory::{DeckFilter, ItemMemoryState, ReviewItem};

/// Record store kept entirely in process memory
pub struct MemoryStore {
    items: Mutex<Vec<ReviewItem>>,
    failing_puts: AtomicUsize,
    completed_puts: AtomicUsize,
    paused: watch::Sender<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            items: Mutex::new(Vec::new()),
            failing_puts: AtomicUsize::new(0),
            completed_puts: AtomicUsize::new(0),
            paused,
        }
    }

    /// Store pre-populated with `items`
    pub fn with_items(items: impl IntoIterator<Item = ReviewItem>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.items.lock() {
            guard.extend(items);
        }
        store
    }

    /// Make the next `n` calls to `put` fail with [`StorageError::Unavailable`]
    pub fn fail_next_puts(&self, n: usize) {
        self.failing_puts.store(n, Ordering::SeqCst);
    }

    /// Hold every `put` until [`MemoryStore::resume_puts`] is called
    pub fn pause_puts(&self) {
        self.paused.send_replace(true);
    }

    /// Release held and future `put` calls
    pub fn resume_puts(&self) {
        self.paused.send_replace(false);
    }

    /// Number of successful `put` calls so far
    pub fn put_count(&self) -> usize {
        self.completed_puts.load(Ordering::SeqCst)
    }

    /// Current copy of an item, bypassing the async interface
    pub fn snapshot(&self, id: &str) -> Option<ReviewItem> {
        self.lock().ok()?.iter().find(|i| i.id == id).cloned()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ReviewItem>>> {
        self.items
            .lock()
            .map_err(|_| StorageError::Init("Memory store lock poisoned".into()))
    }

    fn take_failure(&self) -> bool {
        self.failing_puts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<ReviewItem>> {
        Ok(self.lock()?.iter().find(|i| i.id == id).cloned())
    }

    async fn put(
        &self,
        id: &str,
        state: &ItemMemoryState,
        expected_last_reviewed: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut paused = self.paused.subscribe();
        if paused.wait_for(|p| !*p).await.is_err() {
            return Err(StorageError::Unavailable("store shut down".into()));
        }

        if self.take_failure() {
            tracing::debug!(id, "Injected write failure");
            return Err(StorageError::Unavailable("injected write failure".into()));
        }

        let mut items = self.lock()?;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        if item.state.last_reviewed != expected_last_reviewed
            || item.state.quality_history.len() > state.quality_history.len()
        {
            return Err(StorageError::Conflict(id.to_string()));
        }

        item.state = state.clone();
        self.completed_puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query_due(&self, deck: &DeckFilter, now: DateTime<Utc>) -> Result<Vec<ReviewItem>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|i| deck.matches(&i.deck_id) && i.state.is_due_at(now))
            .cloned()
            .collect())
    }

    async fn insert(&self, item: &ReviewItem) -> Result<()> {
        let mut items = self.lock()?;
        if items.iter().any(|i| i.id == item.id) {
            return Err(StorageError::Conflict(item.id.clone()));
        }
        items.push(item.clone());
        Ok(())
    }

    async fn list(&self, deck: &DeckFilter) -> Result<Vec<ReviewItem>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|i| deck.matches(&i.deck_id))
            .cloned()
            .collect())
    }
}
