//! Shared machinery of the synchronization stores.
//!
//! A store's state is a [`SyncedState`] held in a `watch` channel:
//!
//! - the snapshot, always replaced wholesale;
//! - the last successful sync time;
//! - an in-flight counter behind the loading flag;
//! - the ticket of the last applied result.
//!
//! Every fetch takes a ticket from a monotonic counter when it is issued. Its
//! result is applied only if that ticket is at least the last applied one, so
//! a slow response can never overwrite state from a later request. Local
//! resets take a ticket too.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::warn;

use crate::storage::SessionStorage;

/// Observable state of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedState<S> {
    pub snapshot: S,
    pub last_synced_at: Option<DateTime<Utc>>,
    in_flight: usize,
    applied_ticket: u64,
}

impl<S: Default> SyncedState<S> {
    fn initial(last_synced_at: Option<DateTime<Utc>>) -> Self {
        Self {
            snapshot: S::default(),
            last_synced_at,
            in_flight: 0,
            applied_ticket: 0,
        }
    }
}

impl<S> SyncedState<S> {
    /// Whether any network operation of the store is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// Holds a store's state channel, ticket counter and persisted timestamp key.
pub(crate) struct SyncCell<S> {
    state: watch::Sender<SyncedState<S>>,
    next_ticket: AtomicU64,
    storage: Arc<dyn SessionStorage>,
    storage_key: &'static str,
}

impl<S> SyncCell<S>
where
    S: Clone + Default + Send + Sync,
{
    /// Create the cell, restoring the last-sync timestamp from storage.
    pub(crate) fn new(storage: Arc<dyn SessionStorage>, storage_key: &'static str) -> Self {
        let last_synced_at = match storage.get(storage_key) {
            Ok(value) => value.and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .ok()
            }),
            Err(err) => {
                warn!(error = %err, key = storage_key, "Failed to read sync timestamp");
                None
            }
        };

        let (state, _) = watch::channel(SyncedState::initial(last_synced_at));
        Self {
            state,
            next_ticket: AtomicU64::new(0),
            storage,
            storage_key,
        }
    }

    /// Take the next ticket.
    pub(crate) fn ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mark a network operation in flight until the guard drops.
    pub(crate) fn begin(&self) -> LoadingGuard<'_, S> {
        self.state.send_modify(|state| state.in_flight += 1);
        LoadingGuard { state: &self.state }
    }

    /// Apply a fetched snapshot if no later result has been applied.
    ///
    /// Returns whether the snapshot was applied.
    pub(crate) fn apply(&self, ticket: u64, snapshot: S) -> bool {
        let now = Utc::now();
        let applied = self.state.send_if_modified(|state| {
            if ticket < state.applied_ticket {
                return false;
            }
            state.snapshot = snapshot;
            state.last_synced_at = Some(now);
            state.applied_ticket = ticket;
            true
        });

        if applied && let Err(err) = self.storage.set(self.storage_key, &now.to_rfc3339()) {
            warn!(error = %err, key = self.storage_key, "Failed to persist sync timestamp");
        }
        applied
    }

    /// Clear the snapshot and sync time locally. No network, no storage.
    pub(crate) fn reset(&self) {
        let ticket = self.ticket();
        self.state.send_modify(|state| {
            state.snapshot = S::default();
            state.last_synced_at = None;
            state.applied_ticket = ticket;
        });
    }

    pub(crate) fn current(&self) -> SyncedState<S> {
        self.state.borrow().clone()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&SyncedState<S>) -> R) -> R {
        f(&self.state.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SyncedState<S>> {
        self.state.subscribe()
    }
}

/// Decrements the in-flight counter on drop, whatever the exit path.
pub(crate) struct LoadingGuard<'a, S> {
    state: &'a watch::Sender<SyncedState<S>>,
}

impl<S> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        self.state
            .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
    }
}
