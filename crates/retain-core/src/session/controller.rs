//! Session controller
//!
//! Owns the queue and a working copy of each queued item. All methods take
//! `&self`; the mutable part sits behind a `std::sync::Mutex` that is never
//! held across an `.await`, so a second caller sees `Committing` while a
//! write is in flight and is turned away with [`SessionError::Busy`].

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::events::{SessionEvent, DEFAULT_EVENT_CAPACITY};
use super::{SessionError, SessionState, SessionSummary};
use crate::estimate::format_estimate;
use crate::memory::{DeckFilter, ItemMemoryState, ReviewItem};
use crate::queue::ReviewQueue;
use crate::scheduler::{PreviewResults, Rating, Scheduler};
use crate::storage::RecordStore;

type CompletionHook = Box<dyn FnOnce(&SessionSummary) + Send>;

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub item_id: String,
    pub rating: Rating,
    /// State that was persisted
    pub state: ItemMemoryState,
    /// Formatted interval until the item is due again
    pub estimate: String,
    /// Whether this commit exhausted the queue
    pub session_complete: bool,
}

struct Inner {
    state: SessionState,
    queue: ReviewQueue,
    items: HashMap<String, ReviewItem>,
    summary: SessionSummary,
    hooks: Vec<CompletionHook>,
    reflected: bool,
}

impl Inner {
    fn current(&self) -> Option<&ReviewItem> {
        self.queue.current().and_then(|id| self.items.get(id))
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        match self.state {
            actual if actual == expected => Ok(()),
            SessionState::Committing => Err(SessionError::Busy),
            actual => Err(SessionError::InvalidState { expected, actual }),
        }
    }
}

/// Restores `AwaitingRating` if a commit future is dropped before the write resolves
struct CommitGuard<'a> {
    inner: &'a Mutex<Inner>,
    armed: bool,
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == SessionState::Committing {
            inner.state = SessionState::AwaitingRating;
            tracing::debug!("Commit abandoned, session returned to awaiting rating");
        }
    }
}

/// Drives one review session over a fixed queue of due items
pub struct SessionController {
    store: Arc<dyn RecordStore>,
    scheduler: Scheduler,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Start a session over the items due now
    pub async fn start(
        store: Arc<dyn RecordStore>,
        scheduler: Scheduler,
        deck: DeckFilter,
    ) -> Result<Self, SessionError> {
        Self::start_at(store, scheduler, deck, Utc::now()).await
    }

    /// Start a session over the items due at `now`
    pub async fn start_at(
        store: Arc<dyn RecordStore>,
        scheduler: Scheduler,
        deck: DeckFilter,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self::start_with_events(store, scheduler, deck, events, now).await
    }

    /// Start a session that publishes on an existing event channel.
    ///
    /// Subscribers created before this call see `SessionStarted`.
    pub async fn start_with_events(
        store: Arc<dyn RecordStore>,
        scheduler: Scheduler,
        deck: DeckFilter,
        events: broadcast::Sender<SessionEvent>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let due = store.query_due(&deck, now).await?;
        let queue = ReviewQueue::build(&due, &deck, now);
        let total = queue.len();
        let items = due.into_iter().map(|item| (item.id.clone(), item)).collect();

        let mut summary = SessionSummary::new(deck.to_string(), total, now);
        let state = if queue.is_complete() {
            summary.completed_at = Some(now);
            SessionState::SessionComplete
        } else {
            SessionState::AwaitingReveal
        };

        tracing::info!(deck = %deck, queue_len = total, "Review session started");
        let _ = events.send(SessionEvent::SessionStarted {
            deck: deck.to_string(),
            queue_len: total,
            timestamp: now,
        });
        if state == SessionState::SessionComplete {
            let _ = events.send(SessionEvent::SessionCompleted {
                summary: summary.clone(),
                timestamp: now,
            });
        }

        Ok(Self {
            store,
            scheduler,
            inner: Mutex::new(Inner {
                state,
                queue,
                items,
                summary,
                hooks: Vec::new(),
                reflected: false,
            }),
            events,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, SessionError> {
        self.inner.lock().map_err(|_| SessionError::Poisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Listen for session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.read(|inner| inner.state)
    }

    /// Item under the cursor, as of the last successful commit
    pub fn current_item(&self) -> Option<ReviewItem> {
        self.read(|inner| inner.current().cloned())
    }

    /// `(reviewed, total)`
    pub fn progress(&self) -> (usize, usize) {
        self.read(|inner| (inner.queue.position(), inner.queue.len()))
    }

    pub fn summary(&self) -> SessionSummary {
        self.read(|inner| inner.summary.clone())
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Show the back of the current item
    pub fn reveal(&self) -> Result<ReviewItem, SessionError> {
        let mut inner = self.lock()?;
        inner.expect_state(SessionState::AwaitingReveal)?;
        let item = inner
            .current()
            .cloned()
            .ok_or(SessionError::InvalidState {
                expected: SessionState::AwaitingReveal,
                actual: SessionState::SessionComplete,
            })?;
        inner.state = SessionState::AwaitingRating;
        drop(inner);

        self.emit(SessionEvent::AnswerRevealed {
            item_id: item.id.clone(),
            timestamp: Utc::now(),
        });
        Ok(item)
    }

    /// What each rating would do to the current item, as of now
    pub fn preview_all(&self) -> Result<PreviewResults, SessionError> {
        self.preview_all_at(Utc::now())
    }

    /// What each rating would do to the current item at `now`.
    ///
    /// Works on copies; the live item is never touched.
    pub fn preview_all_at(&self, now: DateTime<Utc>) -> Result<PreviewResults, SessionError> {
        let inner = self.lock()?;
        inner.expect_state(SessionState::AwaitingRating)?;
        let item = inner.current().ok_or(SessionError::InvalidState {
            expected: SessionState::AwaitingRating,
            actual: SessionState::SessionComplete,
        })?;
        Ok(self.scheduler.preview(&item.state, now))
    }

    /// Rate the current item with the wall clock
    pub async fn commit(
        &self,
        rating: Rating,
        note: Option<&str>,
    ) -> Result<CommitOutcome, SessionError> {
        self.commit_at(rating, note, Utc::now()).await
    }

    /// Rate the current item from a keyboard key (`1`-`4`)
    pub async fn commit_key(
        &self,
        key: char,
        note: Option<&str>,
    ) -> Result<CommitOutcome, SessionError> {
        let rating = Rating::from_key(key).ok_or(SessionError::UnknownKey(key))?;
        self.commit(rating, note).await
    }

    /// Rate the current item at `now`, persist it, and advance.
    ///
    /// On a store failure the computed state is discarded, the session goes
    /// back to `AwaitingRating` on the same item, and the error is returned.
    pub async fn commit_at(
        &self,
        rating: Rating,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome, SessionError> {
        let (item_id, before, next) = {
            let mut inner = self.lock()?;
            inner.expect_state(SessionState::AwaitingRating)?;
            let item = inner.current().ok_or(SessionError::InvalidState {
                expected: SessionState::AwaitingRating,
                actual: SessionState::SessionComplete,
            })?;
            let next = self.scheduler.apply_review(&item.state, rating, note, now);
            let snapshot = (item.id.clone(), item.state.clone(), next);
            inner.state = SessionState::Committing;
            snapshot
        };

        let mut guard = CommitGuard {
            inner: &self.inner,
            armed: true,
        };
        let written = self.store.put(&item_id, &next, before.last_reviewed).await;
        guard.armed = false;

        // Settle state even if the lock was poisoned while the write was in flight
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = written {
            inner.state = SessionState::AwaitingRating;
            drop(inner);
            tracing::warn!(item_id = %item_id, error = %e, "Failed to persist review");
            self.emit(SessionEvent::CommitFailed {
                item_id,
                reason: e.to_string(),
                timestamp: now,
            });
            return Err(SessionError::Persistence(e));
        }

        let estimate = format_estimate(next.interval);
        if let Some(item) = inner.items.get_mut(&item_id) {
            item.state = next.clone();
        }
        let summary = &mut inner.summary;
        summary.reviewed += 1;
        summary.ratings.record(rating);
        if before.is_learning_phase() && !next.is_learning {
            summary.graduated += 1;
        }
        if !before.is_learning_phase() && next.is_learning {
            summary.lapsed += 1;
        }

        inner.queue.advance();
        let session_complete = inner.queue.is_complete();
        let mut completion = None;
        if session_complete {
            inner.state = SessionState::SessionComplete;
            inner.summary.completed_at = Some(now);
            completion = Some((inner.summary.clone(), std::mem::take(&mut inner.hooks)));
        } else {
            inner.state = SessionState::AwaitingReveal;
        }
        drop(inner);

        tracing::info!(
            item_id = %item_id,
            rating = %rating,
            interval = next.interval,
            is_learning = next.is_learning,
            "Review committed"
        );
        self.emit(SessionEvent::ReviewCommitted {
            item_id: item_id.clone(),
            rating,
            interval: next.interval,
            estimate: estimate.clone(),
            next_review: next.next_review,
            is_learning: next.is_learning,
            timestamp: now,
        });

        if let Some((summary, hooks)) = completion {
            tracing::info!(reviewed = summary.reviewed, "Review session completed");
            self.emit(SessionEvent::SessionCompleted {
                summary: summary.clone(),
                timestamp: now,
            });
            for hook in hooks {
                hook(&summary);
            }
        }

        Ok(CommitOutcome {
            item_id,
            rating,
            state: next,
            estimate,
            session_complete,
        })
    }

    // ========================================================================
    // COMPLETION
    // ========================================================================

    /// Run `hook` once with the summary when the queue is exhausted.
    ///
    /// Runs immediately if the session is already complete.
    pub fn on_session_complete(&self, hook: impl FnOnce(&SessionSummary) + Send + 'static) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == SessionState::SessionComplete {
            let summary = inner.summary.clone();
            drop(inner);
            hook(&summary);
        } else {
            inner.hooks.push(Box::new(hook));
        }
    }

    /// Attach the learner's end-of-session note. Blank text records no note.
    pub fn reflect(&self, note: &str) -> Result<(), SessionError> {
        let mut inner = self.lock()?;
        inner.expect_state(SessionState::SessionComplete)?;
        let note = note.trim();
        inner.summary.reflection = (!note.is_empty()).then(|| note.to_string());
        inner.reflected = true;
        Ok(())
    }

    /// Final summary of a completed, reflected session
    pub fn finish(&self) -> Result<SessionSummary, SessionError> {
        let inner = self.lock()?;
        inner.expect_state(SessionState::SessionComplete)?;
        if !inner.reflected {
            return Err(SessionError::ReflectionPending);
        }
        Ok(inner.summary.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
