//! Username typeahead for the admin log filter

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use oneapi_core::UserSummary;
use parking_lot::Mutex;
use tracing::debug;

use crate::api::LogApi;
use crate::notify::{Notification, Notifier};

/// One selectable entry of the typeahead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOption {
    /// Canonical username written into the filter
    pub value: String,
    /// `"<display name> (@username)"`
    pub label: String,
    /// `None` for usernames typed in by hand
    pub id: Option<i64>,
    pub display_name: String,
}

impl From<&UserSummary> for UserOption {
    fn from(user: &UserSummary) -> Self {
        Self {
            value: user.username.clone(),
            label: format!("{} (@{})", user.display(), user.username),
            id: Some(user.id),
            display_name: user.display_name.clone(),
        }
    }
}

impl UserOption {
    /// Option for a username entered without searching
    pub fn typed(username: &str) -> Self {
        Self {
            value: username.to_string(),
            label: username.to_string(),
            id: None,
            display_name: String::new(),
        }
    }
}

/// Result of a typeahead search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank input; options cleared without a request
    Cleared,
    /// Options replaced with this many results
    Loaded(usize),
    /// A newer search superseded this one; result ignored
    Stale,
    /// The request failed and a notification was sent
    Failed,
    /// Only admins may search users
    Unavailable,
}

/// Typeahead state: current options and loading flag
#[derive(Debug, Default)]
pub struct UserSearch {
    options: Mutex<Vec<UserOption>>,
    loading: AtomicBool,
    generation: AtomicU64,
}

impl UserSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> Vec<UserOption> {
        self.options.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Replace the options with the users matching `query`
    pub async fn search(
        &self,
        api: &dyn LogApi,
        query: &str,
        notifier: &dyn Notifier,
    ) -> SearchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let keyword = query.trim();
        if keyword.is_empty() {
            self.options.lock().clear();
            self.loading.store(false, Ordering::Release);
            return SearchOutcome::Cleared;
        }

        self.loading.store(true, Ordering::Release);
        let result = api.search_users(keyword).await;

        let mut options = self.options.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(keyword, "Discarding superseded user search");
            return SearchOutcome::Stale;
        }
        self.loading.store(false, Ordering::Release);

        match result {
            Ok(users) => {
                *options = users.iter().map(UserOption::from).collect();
                SearchOutcome::Loaded(options.len())
            }
            Err(e) => {
                drop(options);
                notifier.notify(Notification::from_error(&e));
                SearchOutcome::Failed
            }
        }
    }

    /// Add a hand-typed username unless it is already offered
    pub fn add_option(&self, username: &str) -> UserOption {
        let mut options = self.options.lock();
        if let Some(existing) = options.iter().find(|o| o.value == username) {
            return existing.clone();
        }
        let option = UserOption::typed(username);
        options.push(option.clone());
        option
    }
}
