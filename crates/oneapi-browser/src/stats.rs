//! On-demand aggregate statistics

use std::sync::atomic::{AtomicBool, Ordering};

use oneapi_client::StatQuery;
use oneapi_core::StatSnapshot;
use parking_lot::Mutex;
use tracing::debug;

use crate::api::LogApi;
use crate::flag::InFlight;
use crate::notify::{Notification, Notifier};

/// Result of a reveal or refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOutcome {
    /// A request was made and succeeded
    Fetched(StatSnapshot),
    /// Already revealed; no request was made
    Cached(StatSnapshot),
    /// Another request of the same kind is still running
    Busy,
    /// The request failed and a notification was sent
    Failed,
}

impl StatOutcome {
    pub fn snapshot(&self) -> Option<StatSnapshot> {
        match self {
            StatOutcome::Fetched(s) | StatOutcome::Cached(s) => Some(*s),
            StatOutcome::Busy | StatOutcome::Failed => None,
        }
    }
}

/// Aggregate quota/token totals, fetched only when asked for
#[derive(Debug, Default)]
pub struct StatFetcher {
    snapshot: Mutex<Option<StatSnapshot>>,
    revealed: AtomicBool,
    revealing: AtomicBool,
    refreshing: AtomicBool,
}

impl StatFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<StatSnapshot> {
        *self.snapshot.lock()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed.load(Ordering::Acquire)
    }

    /// Fetch once and show; while shown, return the stored snapshot
    pub async fn reveal(
        &self,
        api: &dyn LogApi,
        query: &StatQuery,
        notifier: &dyn Notifier,
    ) -> StatOutcome {
        if self.is_revealed() {
            if let Some(snapshot) = self.snapshot() {
                return StatOutcome::Cached(snapshot);
            }
        }
        let Some(_guard) = InFlight::acquire(&self.revealing) else {
            debug!("Stat reveal already in flight");
            return StatOutcome::Busy;
        };

        match api.fetch_stat(query).await {
            Ok(snapshot) => {
                *self.snapshot.lock() = Some(snapshot);
                self.revealed.store(true, Ordering::Release);
                StatOutcome::Fetched(snapshot)
            }
            Err(e) => {
                notifier.notify(Notification::from_error(&e));
                StatOutcome::Failed
            }
        }
    }

    pub fn hide(&self) {
        self.revealed.store(false, Ordering::Release);
    }

    /// Refetch regardless of visibility; overlapping refreshes are dropped
    pub async fn refresh(
        &self,
        api: &dyn LogApi,
        query: &StatQuery,
        notifier: &dyn Notifier,
    ) -> StatOutcome {
        let Some(_guard) = InFlight::acquire(&self.refreshing) else {
            debug!("Stat refresh already in flight");
            return StatOutcome::Busy;
        };

        match api.fetch_stat(query).await {
            Ok(snapshot) => {
                *self.snapshot.lock() = Some(snapshot);
                StatOutcome::Fetched(snapshot)
            }
            Err(e) => {
                notifier.notify(Notification::from_error(&e));
                StatOutcome::Failed
            }
        }
    }
}
