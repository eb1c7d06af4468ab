//! Headless paged log browser
//!
//! [`LogBrowser`] owns the filter form, the sort state, the incremental page
//! cache, the aggregate statistics and the user typeahead of the log view.
//! All methods take `&self`; state lives behind a short-lived lock that is
//! never held across a request, so fetches may overlap.
//!
//! Every fetch from page 0 starts a new generation. A response that arrives
//! after a newer generation has started is dropped without touching the
//! cache or notifying.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oneapi_client::{LogQuery, StatQuery};
use oneapi_core::{LogEntry, LogFilter, LogType, Scope, SortColumn, SortOrder, StatSnapshot};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::api::LogApi;
use crate::cache::{PageCache, PageSlice};
use crate::error::FilterError;
use crate::filter::{FilterField, FilterState};
use crate::flag::{InFlight, Loading};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::settings::Settings;
use crate::sort::SortState;
use crate::stats::{StatFetcher, StatOutcome};
use crate::users::{SearchOutcome, UserOption, UserSearch};

/// Result of a page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// The page was fetched and written to the cache
    Loaded { page: usize, rows: usize },
    /// The page was already cached; no request was made
    Cached,
    /// A newer reset started while this request was in flight
    Stale,
    /// The request failed and a notification was sent
    Failed,
}

impl PageLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, PageLoad::Loaded { .. })
    }
}

/// Result of a sort column click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOutcome {
    /// A sort-triggered fetch was still running; the click was dropped
    Ignored,
    Applied {
        column: SortColumn,
        order: SortOrder,
        load: PageLoad,
    },
}

#[derive(Debug)]
struct BrowserState {
    filter: FilterState,
    sort: SortState,
    cache: PageCache,
    active_page: usize,
    page_size: usize,
}

/// A page load captured together with the generation it belongs to
struct PageRequest {
    page: usize,
    generation: u64,
    query: LogQuery,
}

/// Headless controller behind the usage log view
pub struct LogBrowser {
    api: Arc<dyn LogApi>,
    scope: Scope,
    settings: Settings,
    notifier: Arc<dyn Notifier>,
    state: Mutex<BrowserState>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    sort_loading: AtomicBool,
    stats: StatFetcher,
    users: UserSearch,
}

impl LogBrowser {
    /// Create a browser with the default filters for the current time.
    ///
    /// Nothing is fetched until [`open`](Self::open) is called.
    pub fn new(api: Arc<dyn LogApi>, scope: Scope, settings: Settings) -> Self {
        Self::new_at(api, scope, settings, Utc::now())
    }

    /// Create a browser whose default time range is relative to `now`
    pub fn new_at(
        api: Arc<dyn LogApi>,
        scope: Scope,
        settings: Settings,
        now: DateTime<Utc>,
    ) -> Self {
        let page_size = settings.page_size();
        Self {
            api,
            scope,
            settings,
            notifier: Arc::new(TracingNotifier),
            state: Mutex::new(BrowserState {
                filter: FilterState::with_defaults(now),
                sort: SortState::new(),
                cache: PageCache::new(),
                active_page: 0,
                page_size,
            }),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            sort_loading: AtomicBool::new(false),
            stats: StatFetcher::new(),
            users: UserSearch::new(),
        }
    }

    /// Deliver notifications to `notifier` instead of the tracing log
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Start from `filter` instead of the default time range
    pub fn with_filter(self, filter: LogFilter) -> Self {
        self.state.lock().filter = FilterState::from_filter(filter);
        self
    }

    /// Start sorted by `column` in `order` without a click
    pub fn with_sort(self, column: SortColumn, order: SortOrder) -> Self {
        self.state.lock().sort = SortState::sorted(column, order);
        self
    }

    /// Fetch the first page with the current filters
    pub async fn open(&self) -> PageLoad {
        self.load_page(0).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn filter(&self) -> LogFilter {
        self.state.lock().filter.filter().clone()
    }

    pub fn sort(&self) -> SortState {
        self.state.lock().sort
    }

    /// Zero-based index of the displayed page
    pub fn active_page(&self) -> usize {
        self.state.lock().active_page
    }

    pub fn page_size(&self) -> usize {
        self.state.lock().page_size
    }

    /// Pages the pager offers
    pub fn page_count(&self) -> usize {
        let state = self.state.lock();
        state.cache.page_count(state.page_size)
    }

    /// One past the highest cached position
    pub fn cached_extent(&self) -> usize {
        self.state.lock().cache.extent()
    }

    /// Whether any page fetch is running
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn is_sort_loading(&self) -> bool {
        self.sort_loading.load(Ordering::Acquire)
    }

    /// Run `f` over the displayed page without copying it
    pub fn view_page<R>(&self, f: impl FnOnce(&PageSlice<'_>) -> R) -> R {
        let state = self.state.lock();
        let slice = state.cache.page(state.active_page, state.page_size);
        f(&slice)
    }

    /// Owned copy of the displayed page's rows
    pub fn current_rows(&self) -> Vec<LogEntry> {
        self.view_page(|page| page.entries().cloned().collect())
    }

    /// Run `f` over the whole cache
    pub fn with_cache<R>(&self, f: impl FnOnce(&PageCache) -> R) -> R {
        f(&self.state.lock().cache)
    }

    // =========================================================================
    // Fetching and paging
    // =========================================================================

    /// Fetch page `page` with the current filters and sort.
    ///
    /// Page 0 replaces the cache and starts a new generation; later pages
    /// overwrite their window of the cache within the current generation.
    #[instrument(skip(self))]
    pub async fn load_page(&self, page: usize) -> PageLoad {
        let request = {
            let state = self.state.lock();
            self.prepare(&state, page)
        };
        self.fetch(request, false).await
    }

    /// Generation and query for a load of `page`. Callers hold the state lock
    /// across the change that triggers the load and this call.
    fn prepare(&self, state: &BrowserState, page: usize) -> PageRequest {
        let generation = if page == 0 {
            self.generation.fetch_add(1, Ordering::AcqRel) + 1
        } else {
            self.generation.load(Ordering::Acquire)
        };
        let query = LogQuery::new(
            self.scope,
            state.filter.filter().clone(),
            page,
            state.page_size,
        )
        .with_sort(state.sort.active());
        PageRequest {
            page,
            generation,
            query,
        }
    }

    /// Run a prepared request. Unless the response is stale, it is written to
    /// the cache and, with `commit_page`, the page becomes the active one.
    async fn fetch(&self, request: PageRequest, commit_page: bool) -> PageLoad {
        let PageRequest {
            page,
            generation,
            query,
        } = request;

        let result = {
            let _loading = Loading::start(&self.in_flight);
            self.api.fetch_logs(&query).await
        };

        let mut state = self.state.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(page, generation, "Discarding stale log page");
            return PageLoad::Stale;
        }
        if commit_page {
            state.active_page = page;
        }

        match result {
            Ok(rows) => {
                let count = rows.len();
                if page == 0 {
                    state.cache.replace(rows);
                } else {
                    state.cache.write_page(page, query.page_size(), rows);
                }
                debug!(page, rows = count, "Cached log page");
                PageLoad::Loaded { page, rows: count }
            }
            Err(e) => {
                drop(state);
                self.notifier.notify(Notification::from_error(&e));
                PageLoad::Failed
            }
        }
    }

    /// Move to zero-based page `page`.
    ///
    /// A page that is not fully cached is fetched first. The page index is
    /// committed whether the fetch succeeds or fails, but not when the
    /// response was superseded by a newer first-page load.
    pub async fn go_to_page(&self, page: usize) -> PageLoad {
        let request = {
            let mut state = self.state.lock();
            if page < state.cache.full_pages(state.page_size) {
                state.active_page = page;
                return PageLoad::Cached;
            }
            self.prepare(&state, page)
        };
        self.fetch(request, true).await
    }

    /// Change the page size, remember it, and reload from the first page
    pub async fn set_page_size(&self, page_size: usize) -> PageLoad {
        let page_size = page_size.max(1);
        if let Err(e) = self.settings.set_page_size(page_size) {
            self.notifier
                .notify(Notification::error(format!("Error: {}", e)));
        }
        let request = {
            let mut state = self.state.lock();
            state.page_size = page_size;
            state.cache.clear();
            state.active_page = 0;
            self.prepare(&state, 0)
        };
        self.fetch(request, false).await
    }

    // =========================================================================
    // Filters and sorting
    // =========================================================================

    /// Edit one filter field. Takes effect on the next [`submit`](Self::submit).
    pub fn set_field(&self, field: FilterField, value: &str) -> Result<(), FilterError> {
        self.state.lock().filter.set_field(field, value)
    }

    /// Change the log type and reload immediately
    pub async fn set_log_type(&self, log_type: Option<LogType>) -> PageLoad {
        let request = {
            let mut state = self.state.lock();
            state.filter.set_log_type(log_type);
            state.active_page = 0;
            self.prepare(&state, 0)
        };
        self.fetch(request, false).await
    }

    /// Apply the edited filters: back to the first page and reload
    pub async fn submit(&self) -> PageLoad {
        let request = {
            let mut state = self.state.lock();
            state.active_page = 0;
            self.prepare(&state, 0)
        };
        self.fetch(request, false).await
    }

    /// Click on a sortable column header.
    ///
    /// Clicks arriving while a sort-triggered fetch is running are dropped.
    pub async fn toggle_sort(&self, column: SortColumn) -> SortOutcome {
        let Some(_guard) = InFlight::acquire(&self.sort_loading) else {
            debug!(%column, "Sort already loading, ignoring click");
            return SortOutcome::Ignored;
        };
        let (column, order, request) = {
            let mut state = self.state.lock();
            state.active_page = 0;
            let (column, order) = state.sort.toggle(column);
            (column, order, self.prepare(&state, 0))
        };
        let load = self.fetch(request, false).await;
        SortOutcome::Applied {
            column,
            order,
            load,
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    fn stat_query(&self) -> StatQuery {
        StatQuery::new(self.scope, self.filter())
    }

    /// Show the aggregate totals, fetching them the first time
    pub async fn reveal_stats(&self) -> StatOutcome {
        let query = self.stat_query();
        self.stats
            .reveal(self.api.as_ref(), &query, self.notifier.as_ref())
            .await
    }

    pub fn hide_stats(&self) {
        self.stats.hide();
    }

    /// Refetch the aggregate totals for the current filters
    pub async fn refresh_stats(&self) -> StatOutcome {
        let query = self.stat_query();
        self.stats
            .refresh(self.api.as_ref(), &query, self.notifier.as_ref())
            .await
    }

    pub fn stats(&self) -> Option<StatSnapshot> {
        self.stats.snapshot()
    }

    pub fn stats_revealed(&self) -> bool {
        self.stats.is_revealed()
    }

    // =========================================================================
    // User typeahead
    // =========================================================================

    /// Search users by name; admin scope only
    pub async fn search_users(&self, query: &str) -> SearchOutcome {
        if !self.scope.is_admin() {
            return SearchOutcome::Unavailable;
        }
        self.users
            .search(self.api.as_ref(), query, self.notifier.as_ref())
            .await
    }

    pub fn user_options(&self) -> Vec<UserOption> {
        self.users.options()
    }

    pub fn is_searching_users(&self) -> bool {
        self.users.is_loading()
    }

    /// Put the option's canonical username into the filter
    pub fn select_user(&self, option: &UserOption) {
        self.state.lock().filter.set_username(&option.value);
    }

    /// Offer a username typed by hand and select it
    pub fn add_username_option(&self, username: &str) -> UserOption {
        let option = self.users.add_option(username.trim());
        self.select_user(&option);
        option
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use oneapi_client::testing::sample_logs;
    use oneapi_client::{OneApiError, Result};
    use oneapi_core::UserSummary;
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;
    use crate::notify::{CollectingNotifier, Level};

    /// Scriptable in-memory backend recording every call
    #[derive(Default)]
    struct FakeApi {
        rows: Mutex<Vec<LogEntry>>,
        scripted: Mutex<VecDeque<Vec<LogEntry>>>,
        log_queries: Mutex<Vec<LogQuery>>,
        log_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
        fail_next: Mutex<Option<OneApiError>>,
        stat_calls: AtomicUsize,
        stat_gate: Mutex<Option<oneshot::Receiver<()>>>,
        users: Mutex<Vec<UserSummary>>,
        user_queries: Mutex<Vec<String>>,
        user_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    }

    impl FakeApi {
        fn with_rows(count: i64) -> Self {
            let api = Self::default();
            *api.rows.lock() = sample_logs(count);
            api
        }

        fn gate_next_log(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.log_gates.lock().push_back(rx);
            tx
        }

        fn log_queries(&self) -> Vec<LogQuery> {
            self.log_queries.lock().clone()
        }
    }

    #[async_trait]
    impl LogApi for FakeApi {
        async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
            self.log_queries.lock().push(query.clone());
            let response = match self.scripted.lock().pop_front() {
                Some(rows) => rows,
                None => self
                    .rows
                    .lock()
                    .iter()
                    .skip(query.page() * query.page_size())
                    .take(query.page_size())
                    .cloned()
                    .collect(),
            };
            let failure = self.fail_next.lock().take();

            let gate = self.log_gates.lock().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(response),
            }
        }

        async fn fetch_stat(&self, _query: &StatQuery) -> Result<StatSnapshot> {
            self.stat_calls.fetch_add(1, Ordering::AcqRel);
            let gate = self.stat_gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let rows = self.rows.lock();
            Ok(StatSnapshot {
                quota: rows.iter().map(|r| r.quota).sum(),
                token: rows.iter().map(|r| r.total_tokens()).sum(),
            })
        }

        async fn search_users(&self, keyword: &str) -> Result<Vec<UserSummary>> {
            self.user_queries.lock().push(keyword.to_string());
            let matches: Vec<UserSummary> = self
                .users
                .lock()
                .iter()
                .filter(|u| u.username.contains(keyword))
                .cloned()
                .collect();
            let gate = self.user_gates.lock().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(matches)
        }
    }

    const NOW: i64 = 1_700_000_000;

    fn browser(api: &Arc<FakeApi>, scope: Scope) -> (LogBrowser, Arc<CollectingNotifier>) {
        browser_with_settings(api, scope, Settings::in_memory())
    }

    fn browser_with_settings(
        api: &Arc<FakeApi>,
        scope: Scope,
        settings: Settings,
    ) -> (LogBrowser, Arc<CollectingNotifier>) {
        let notifier = Arc::new(CollectingNotifier::new());
        let now = Utc.timestamp_opt(NOW, 0).unwrap();
        let browser = LogBrowser::new_at(api.clone(), scope, settings, now)
            .with_notifier(notifier.clone());
        (browser, notifier)
    }

    fn ids(rows: &[LogEntry]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    // =========================================================================
    // Opening and paging
    // =========================================================================

    #[tokio::test]
    async fn test_open_uses_default_filters() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);

        assert_eq!(browser.open().await, PageLoad::Loaded { page: 0, rows: 10 });

        let queries = api.log_queries();
        assert_eq!(queries.len(), 1);
        let filter = queries[0].filter();
        assert_eq!(filter.start_timestamp, Some(NOW - 7 * 86_400));
        assert_eq!(filter.end_timestamp, Some(NOW + 3_600));
        assert_eq!(filter.log_type, None);
        assert_eq!(queries[0].page(), 0);

        assert_eq!(ids(&browser.current_rows()), (1..=10).collect::<Vec<_>>());
        assert_eq!(browser.cached_extent(), 10);
    }

    #[tokio::test]
    async fn test_uncached_page_is_fetched_into_its_window() {
        let api = Arc::new(FakeApi::with_rows(25));
        let settings = Settings::in_memory();
        settings.set_page_size(20).unwrap();
        let (browser, _) = browser_with_settings(&api, Scope::Admin, settings);

        // Server hands back 25 rows for the first page
        api.scripted.lock().push_back(sample_logs(25));
        browser.open().await;
        assert_eq!(browser.cached_extent(), 25);

        let replacement: Vec<LogEntry> = sample_logs(105).into_iter().skip(100).collect();
        api.scripted.lock().push_back(replacement);

        assert_eq!(
            browser.go_to_page(1).await,
            PageLoad::Loaded { page: 1, rows: 5 }
        );
        assert_eq!(browser.active_page(), 1);
        assert_eq!(api.log_queries()[1].page(), 1);
        assert_eq!(api.log_queries()[1].page_size(), 20);

        browser.with_cache(|cache| {
            assert_eq!(cache.get(19).map(|r| r.id), Some(20));
            assert_eq!(cache.get(20).map(|r| r.id), Some(101));
            assert_eq!(cache.get(24).map(|r| r.id), Some(105));
        });
    }

    #[tokio::test]
    async fn test_cached_pages_need_no_request() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);

        browser.open().await;
        assert!(browser.go_to_page(1).await.is_loaded());
        assert_eq!(browser.go_to_page(0).await, PageLoad::Cached);
        assert_eq!(browser.go_to_page(1).await, PageLoad::Cached);
        assert_eq!(api.log_queries().len(), 2);

        browser.view_page(|page| {
            assert_eq!(page.start(), 10);
            assert_eq!(page.len(), 10);
        });
    }

    #[tokio::test]
    async fn test_page_count_offers_one_more_page_on_boundary() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);

        browser.open().await;
        assert_eq!(browser.page_count(), 2);

        browser.go_to_page(1).await;
        browser.go_to_page(2).await;
        assert_eq!(browser.cached_extent(), 25);
        assert_eq!(browser.page_count(), 3);
    }

    #[tokio::test]
    async fn test_set_page_size_persists_and_reloads() {
        let api = Arc::new(FakeApi::with_rows(25));
        let settings = Settings::in_memory();
        let (browser, _) = browser_with_settings(&api, Scope::Admin, settings.clone());

        browser.open().await;
        browser.go_to_page(1).await;

        let load = browser.set_page_size(20).await;
        assert_eq!(load, PageLoad::Loaded { page: 0, rows: 20 });
        assert_eq!(settings.page_size(), 20);
        assert_eq!(browser.active_page(), 0);
        assert_eq!(browser.cached_extent(), 20);
        assert_eq!(api.log_queries().last().map(|q| q.page_size()), Some(20));
    }

    #[tokio::test]
    async fn test_failure_notifies_and_keeps_cache() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, notifier) = browser(&api, Scope::Admin);
        browser.open().await;

        *api.fail_next.lock() = Some(OneApiError::RateLimited);
        assert_eq!(browser.submit().await, PageLoad::Failed);

        assert_eq!(browser.cached_extent(), 10);
        assert_eq!(
            notifier.notifications(),
            vec![Notification::error(
                "Too many requests, please try again later"
            )]
        );
    }

    #[tokio::test]
    async fn test_demo_mode_is_info() {
        let api = Arc::new(FakeApi::with_rows(1));
        let (browser, notifier) = browser(&api, Scope::Admin);

        *api.fail_next.lock() = Some(OneApiError::DemoMode);
        browser.open().await;
        assert_eq!(notifier.notifications()[0].level, Level::Info);
    }

    // =========================================================================
    // Generations
    // =========================================================================

    #[tokio::test]
    async fn test_stale_first_page_is_discarded() {
        let api = Arc::new(FakeApi::with_rows(3));
        let (browser, notifier) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);

        let release = api.gate_next_log();
        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.load_page(0).await }
        });
        wait_until(|| api.log_queries().len() == 1).await;

        *api.rows.lock() = sample_logs(5);
        assert_eq!(
            browser.load_page(0).await,
            PageLoad::Loaded { page: 0, rows: 5 }
        );

        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), PageLoad::Stale);
        assert_eq!(browser.cached_extent(), 5);
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_stale_failure_is_silent() {
        let api = Arc::new(FakeApi::with_rows(3));
        let (browser, notifier) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);

        *api.fail_next.lock() = Some(OneApiError::server_error(500, "boom"));
        let release = api.gate_next_log();
        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.open().await }
        });
        wait_until(|| api.log_queries().len() == 1).await;

        browser.submit().await;
        release.send(()).unwrap();

        assert_eq!(slow.await.unwrap(), PageLoad::Stale);
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_later_page_from_old_generation_is_discarded() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);
        browser.open().await;

        let release = api.gate_next_log();
        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.load_page(1).await }
        });
        wait_until(|| api.log_queries().len() == 2).await;

        browser.submit().await;
        release.send(()).unwrap();

        assert_eq!(slow.await.unwrap(), PageLoad::Stale);
        assert_eq!(browser.cached_extent(), 10);
    }

    #[tokio::test]
    async fn test_superseded_page_move_keeps_first_page() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);
        browser.open().await;

        let release = api.gate_next_log();
        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.go_to_page(1).await }
        });
        wait_until(|| api.log_queries().len() == 2).await;

        assert!(browser.set_log_type(Some(LogType::Recharge)).await.is_loaded());
        release.send(()).unwrap();

        assert_eq!(slow.await.unwrap(), PageLoad::Stale);
        assert_eq!(browser.active_page(), 0);
        assert_eq!(ids(&browser.current_rows()), (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_old_page_cannot_refill_cleared_cache() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, notifier) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);
        browser.open().await;

        let release = api.gate_next_log();
        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.go_to_page(1).await }
        });
        wait_until(|| api.log_queries().len() == 2).await;

        // The reload after the page size change fails, leaving the cache empty
        *api.fail_next.lock() = Some(OneApiError::server_error(500, "boom"));
        assert_eq!(browser.set_page_size(5).await, PageLoad::Failed);
        release.send(()).unwrap();

        assert_eq!(slow.await.unwrap(), PageLoad::Stale);
        assert_eq!(browser.cached_extent(), 0);
        assert_eq!(browser.active_page(), 0);
        assert_eq!(notifier.notifications().len(), 1);
    }

    // =========================================================================
    // Filters and sorting
    // =========================================================================

    #[tokio::test]
    async fn test_editing_fields_waits_for_submit() {
        let api = Arc::new(FakeApi::with_rows(5));
        let (browser, _) = browser(&api, Scope::Admin);
        browser.open().await;

        browser.set_field(FilterField::ModelName, "gpt-4o").unwrap();
        browser.set_field(FilterField::Channel, "2").unwrap();
        assert_eq!(api.log_queries().len(), 1);

        browser.submit().await;
        let queries = api.log_queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].filter().model_name, "gpt-4o");
        assert_eq!(queries[1].filter().channel, Some(2));
        assert_eq!(queries[1].page(), 0);
    }

    #[tokio::test]
    async fn test_invalid_field_is_rejected() {
        let api = Arc::new(FakeApi::with_rows(5));
        let (browser, _) = browser(&api, Scope::Admin);

        assert!(browser.set_field(FilterField::Channel, "abc").is_err());
        assert_eq!(browser.filter().channel, None);
    }

    #[tokio::test]
    async fn test_log_type_change_refetches_immediately() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);
        browser.open().await;
        browser.go_to_page(1).await;

        browser.set_log_type(Some(LogType::Recharge)).await;

        let queries = api.log_queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].page(), 0);
        assert_eq!(queries[2].filter().log_type, Some(LogType::Recharge));
        assert_eq!(browser.active_page(), 0);
    }

    #[tokio::test]
    async fn test_toggle_sort_twice() {
        let api = Arc::new(FakeApi::with_rows(25));
        let (browser, _) = browser(&api, Scope::Admin);
        browser.open().await;
        browser.go_to_page(1).await;

        let first = browser.toggle_sort(SortColumn::Quota).await;
        assert_eq!(
            first,
            SortOutcome::Applied {
                column: SortColumn::Quota,
                order: SortOrder::Desc,
                load: PageLoad::Loaded { page: 0, rows: 10 },
            }
        );
        assert_eq!(browser.active_page(), 0);

        let second = browser.toggle_sort(SortColumn::Quota).await;
        assert!(matches!(
            second,
            SortOutcome::Applied {
                order: SortOrder::Asc,
                ..
            }
        ));

        let sorts: Vec<_> = api.log_queries()[2..].iter().map(|q| q.sort()).collect();
        assert_eq!(
            sorts,
            vec![
                Some((SortColumn::Quota, SortOrder::Desc)),
                Some((SortColumn::Quota, SortOrder::Asc)),
            ]
        );
        assert!(api.log_queries()[2..].iter().all(|q| q.page() == 0));
    }

    #[tokio::test]
    async fn test_preset_sort_goes_into_first_query() {
        let api = Arc::new(FakeApi::with_rows(5));
        let (browser, _) = browser(&api, Scope::Admin);
        let browser = browser.with_sort(SortColumn::ElapsedTime, SortOrder::Asc);

        browser.open().await;
        assert_eq!(
            api.log_queries()[0].sort(),
            Some((SortColumn::ElapsedTime, SortOrder::Asc))
        );
        assert_eq!(browser.sort().indicator(SortColumn::ElapsedTime), SortOrder::Asc.arrow());
    }

    #[test]
    fn test_loading_flag_spans_the_request() {
        let api = Arc::new(FakeApi::with_rows(5));
        let (browser, _) = browser(&api, Scope::Admin);
        let release = api.gate_next_log();

        let mut load = tokio_test::task::spawn(browser.open());
        tokio_test::assert_pending!(load.poll());
        assert!(browser.is_loading());
        assert_eq!(browser.cached_extent(), 0);

        release.send(()).unwrap();
        assert!(load.is_woken());
        let outcome = tokio_test::assert_ready!(load.poll());
        assert_eq!(outcome, PageLoad::Loaded { page: 0, rows: 5 });
        assert!(!browser.is_loading());
    }

    #[tokio::test]
    async fn test_sort_clicks_dropped_while_loading() {
        let api = Arc::new(FakeApi::with_rows(5));
        let (browser, _) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);

        let release = api.gate_next_log();
        let first = tokio::spawn({
            let browser = browser.clone();
            async move { browser.toggle_sort(SortColumn::ElapsedTime).await }
        });
        wait_until(|| browser.is_sort_loading() && browser.is_loading()).await;

        assert_eq!(
            browser.toggle_sort(SortColumn::Quota).await,
            SortOutcome::Ignored
        );

        release.send(()).unwrap();
        assert!(matches!(first.await.unwrap(), SortOutcome::Applied { .. }));
        assert!(!browser.is_sort_loading());
        assert_eq!(api.log_queries().len(), 1);
        assert_eq!(browser.sort().column(), Some(SortColumn::ElapsedTime));
    }

    #[tokio::test]
    async fn test_self_scope_never_sends_admin_fields() {
        let api = Arc::new(FakeApi::with_rows(5));
        let (browser, _) = browser(&api, Scope::SelfOnly);

        browser.set_field(FilterField::Username, "mallory").unwrap();
        browser.set_field(FilterField::Channel, "9").unwrap();
        browser.submit().await;

        let query = &api.log_queries()[0];
        assert_eq!(query.path(), "/api/log/self");
        assert!(query
            .pairs()
            .iter()
            .all(|(name, _)| *name != "username" && *name != "channel"));
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    #[tokio::test]
    async fn test_reveal_fetches_once() {
        let api = Arc::new(FakeApi::with_rows(3));
        let (browser, _) = browser(&api, Scope::Admin);

        let expected = StatSnapshot { quota: 60, token: 9 };
        assert_eq!(browser.reveal_stats().await, StatOutcome::Fetched(expected));
        assert_eq!(browser.reveal_stats().await, StatOutcome::Cached(expected));
        assert_eq!(api.stat_calls.load(Ordering::Acquire), 1);
        assert!(browser.stats_revealed());

        browser.hide_stats();
        assert!(!browser.stats_revealed());
        browser.reveal_stats().await;
        assert_eq!(api.stat_calls.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn test_refresh_always_fetches() {
        let api = Arc::new(FakeApi::with_rows(3));
        let (browser, _) = browser(&api, Scope::Admin);

        browser.refresh_stats().await;
        browser.refresh_stats().await;
        assert_eq!(api.stat_calls.load(Ordering::Acquire), 2);
        assert!(!browser.stats_revealed());
        assert_eq!(browser.stats(), Some(StatSnapshot { quota: 60, token: 9 }));
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_dropped() {
        let api = Arc::new(FakeApi::with_rows(3));
        let (browser, _) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);

        let (release, gate) = oneshot::channel();
        *api.stat_gate.lock() = Some(gate);
        let first = tokio::spawn({
            let browser = browser.clone();
            async move { browser.refresh_stats().await }
        });
        wait_until(|| api.stat_calls.load(Ordering::Acquire) == 1).await;

        assert_eq!(browser.refresh_stats().await, StatOutcome::Busy);
        release.send(()).unwrap();
        assert!(matches!(first.await.unwrap(), StatOutcome::Fetched(_)));
        assert_eq!(api.stat_calls.load(Ordering::Acquire), 1);
    }

    // =========================================================================
    // User typeahead
    // =========================================================================

    fn summary(id: i64, username: &str) -> UserSummary {
        UserSummary {
            id,
            username: username.to_string(),
            display_name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_blank_search_clears_without_request() {
        let api = Arc::new(FakeApi::default());
        *api.users.lock() = vec![summary(1, "alice")];
        let (browser, _) = browser(&api, Scope::Admin);

        assert_eq!(browser.search_users("ali").await, SearchOutcome::Loaded(1));
        assert_eq!(browser.search_users("   ").await, SearchOutcome::Cleared);
        assert!(browser.user_options().is_empty());
        assert_eq!(api.user_queries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_select_user_sets_username() {
        let api = Arc::new(FakeApi::default());
        *api.users.lock() = vec![summary(1, "alice"), summary(2, "bob")];
        let (browser, _) = browser(&api, Scope::Admin);

        browser.search_users("b").await;
        let option = browser.user_options().remove(0);
        assert_eq!(option.label, "bob (@bob)");

        browser.select_user(&option);
        assert_eq!(browser.filter().username, "bob");

        browser.add_username_option("carol");
        assert_eq!(browser.filter().username, "carol");
        assert_eq!(browser.user_options().len(), 2);
    }

    #[tokio::test]
    async fn test_superseded_search_is_ignored() {
        let api = Arc::new(FakeApi::default());
        *api.users.lock() = vec![summary(1, "alice"), summary(2, "alfred")];
        let (browser, _) = browser(&api, Scope::Admin);
        let browser = Arc::new(browser);

        let (release, gate) = oneshot::channel();
        api.user_gates.lock().push_back(gate);
        let slow = tokio::spawn({
            let browser = browser.clone();
            async move { browser.search_users("al").await }
        });
        wait_until(|| api.user_queries.lock().len() == 1).await;

        assert_eq!(browser.search_users("alf").await, SearchOutcome::Loaded(1));
        release.send(()).unwrap();

        assert_eq!(slow.await.unwrap(), SearchOutcome::Stale);
        assert_eq!(browser.user_options().len(), 1);
    }

    #[tokio::test]
    async fn test_user_search_is_admin_only() {
        let api = Arc::new(FakeApi::default());
        let (browser, _) = browser(&api, Scope::SelfOnly);

        assert_eq!(browser.search_users("al").await, SearchOutcome::Unavailable);
        assert!(api.user_queries.lock().is_empty());
    }
}
