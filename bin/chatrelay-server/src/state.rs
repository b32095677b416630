//! Shared application state injected into every Axum handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chatrelay_core::{PollPolicy, PredictionClient, PromptTemplate};

use crate::config::Config;
use crate::entities::SqliteStore;

/// Tracks conversations that have a prediction outstanding.
///
/// At most one prediction per conversation is in flight. Messages that
/// arrive meanwhile are stored and flagged as queued; when the outstanding
/// prediction completes the caller dispatches one follow-up covering all of
/// them. Entries are cleared when the completion webhook arrives, when
/// submission fails, or once older than `ttl`, so a lost callback cannot
/// block a conversation forever.
pub struct InFlightTracker {
    pending: Mutex<HashMap<String, Pending>>,
    ttl: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    started: Instant,
    queued: bool,
}

/// Outcome of [`InFlightTracker::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// No prediction was pending; the caller must dispatch one.
    Started,
    /// A prediction is already pending; a follow-up will be dispatched when it completes.
    Queued,
}

impl std::fmt::Debug for InFlightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InFlightTracker({} pending)", self.pending_count())
    }
}

impl InFlightTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `conversation_id` for a new prediction, or queue behind the
    /// one already pending.
    pub fn begin(&self, conversation_id: &str) -> Begin {
        self.begin_at(conversation_id, Instant::now())
    }

    fn begin_at(&self, conversation_id: &str, now: Instant) -> Begin {
        let mut map = self.lock();
        map.retain(|_, p| now.saturating_duration_since(p.started) < self.ttl);
        match map.get_mut(conversation_id) {
            Some(pending) => {
                pending.queued = true;
                Begin::Queued
            }
            None => {
                map.insert(
                    conversation_id.to_owned(),
                    Pending {
                        started: now,
                        queued: false,
                    },
                );
                Begin::Started
            }
        }
    }

    /// The outstanding prediction finished.
    ///
    /// Returns `true` if messages were queued meanwhile; the conversation then
    /// stays claimed and the caller must dispatch the follow-up (or
    /// [`finish`](Self::finish) on failure).
    pub fn complete(&self, conversation_id: &str) -> bool {
        self.complete_at(conversation_id, Instant::now())
    }

    fn complete_at(&self, conversation_id: &str, now: Instant) -> bool {
        let mut map = self.lock();
        match map.get_mut(conversation_id) {
            Some(pending) if pending.queued => {
                *pending = Pending {
                    started: now,
                    queued: false,
                };
                true
            }
            Some(_) => {
                map.remove(conversation_id);
                false
            }
            None => false,
        }
    }

    /// Drop the claim. Returns `true` if one was present.
    pub fn finish(&self, conversation_id: &str) -> bool {
        self.lock().remove(conversation_id).is_some()
    }

    pub fn is_pending(&self, conversation_id: &str) -> bool {
        self.lock()
            .get(conversation_id)
            .is_some_and(|p| p.started.elapsed() < self.ttl)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent conversation store.
    pub store: Arc<SqliteStore>,
    /// Outbound inference provider.
    pub predictions: Arc<dyn PredictionClient>,
    /// Conversations with an outstanding prediction.
    pub in_flight: Arc<InFlightTracker>,
    /// Persona labels and preamble for prompt formatting.
    pub prompt: Arc<PromptTemplate>,
    /// Refresh contract evaluated for every conversation response.
    pub poll: PollPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        store: SqliteStore,
        predictions: Arc<dyn PredictionClient>,
    ) -> Self {
        let in_flight = InFlightTracker::new(config.prediction_timeout);
        let poll = PollPolicy::new(config.poll_interval);
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            predictions,
            in_flight: Arc::new(in_flight),
            prompt: Arc::new(PromptTemplate::default()),
            poll,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn second_begin_is_queued_until_completed() {
        let t = InFlightTracker::new(Duration::from_secs(60));
        assert_eq!(t.begin("a"), Begin::Started);
        assert_eq!(t.begin("a"), Begin::Queued);
        assert!(t.is_pending("a"));
        assert_eq!(t.begin("b"), Begin::Started, "other conversations are independent");

        // Queued work keeps the claim for the follow-up prediction.
        assert!(t.complete("a"));
        assert!(t.is_pending("a"));

        // Follow-up answered with nothing queued: released.
        assert!(!t.complete("a"));
        assert!(!t.is_pending("a"));
        assert_eq!(t.begin("a"), Begin::Started);
    }

    #[test]
    fn finish_without_begin_is_harmless() {
        let t = InFlightTracker::new(Duration::from_secs(60));
        assert!(!t.finish("nope"));
        assert!(!t.complete("nope"));
    }

    #[test]
    fn expired_markers_do_not_block() {
        let t = InFlightTracker::new(Duration::from_secs(10));
        let start = Instant::now();
        assert_eq!(t.begin_at("a", start), Begin::Started);
        assert_eq!(t.begin_at("a", start + Duration::from_secs(9)), Begin::Queued);
        assert_eq!(t.begin_at("a", start + Duration::from_secs(10)), Begin::Started);
    }

    #[test]
    fn expired_entries_are_pruned() {
        let t = InFlightTracker::new(Duration::from_secs(1));
        let start = Instant::now();
        for i in 0..1000 {
            t.begin_at(&format!("lost-{i}"), start);
        }
        assert_eq!(t.pending_count(), 1000);

        t.begin_at("fresh", start + Duration::from_secs(3600));
        assert_eq!(t.pending_count(), 1);
        assert_eq!(format!("{t:?}"), "InFlightTracker(1 pending)");
    }

    #[test]
    fn completion_restarts_the_expiry_clock() {
        let t = InFlightTracker::new(Duration::from_secs(10));
        let start = Instant::now();
        t.begin_at("a", start);
        t.begin_at("a", start + Duration::from_secs(5));
        assert!(t.complete_at("a", start + Duration::from_secs(8)));
        assert_eq!(t.begin_at("a", start + Duration::from_secs(15)), Begin::Queued);
    }
}
