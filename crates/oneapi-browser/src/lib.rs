//! oneapi-browser - Headless usage log browser for the One API console
//!
//! The log view of the console, minus the rendering: filter form, column
//! sorting, an incremental page cache, on-demand aggregate statistics and
//! the admin user typeahead. Presentation layers drive a [`LogBrowser`] and
//! read its state back; failures reach them through a [`Notifier`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use oneapi_browser::{LogBrowser, Settings};
//! use oneapi_client::{OneApiClient, Scope, SortColumn};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OneApiClient::with_access_token("http://localhost:3000", "my-access-token")?;
//!     let browser = LogBrowser::new(Arc::new(client), Scope::Admin, Settings::in_memory());
//!
//!     browser.open().await;
//!     browser.toggle_sort(SortColumn::Quota).await;
//!     browser.go_to_page(1).await;
//!
//!     for row in browser.current_rows() {
//!         println!("{} {}", row.model_name, row.quota);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod browser;
pub mod cache;
pub mod error;
pub mod filter;
mod flag;
pub mod format;
pub mod notify;
pub mod settings;
pub mod site;
pub mod sort;
pub mod stats;
pub mod users;

pub use api::LogApi;
pub use browser::{LogBrowser, PageLoad, SortOutcome};
pub use cache::{PageCache, PageSlice};
pub use error::{FilterError, SettingsError, SiteError};
pub use filter::{FilterField, FilterState};
pub use format::{render_latency, render_number, timestamp_to_string, QuotaFormat};
pub use notify::{CollectingNotifier, Level, Notification, Notifier, TracingNotifier};
pub use settings::{FileStore, MemoryStore, Settings, SettingsStore};
pub use sort::SortState;
pub use stats::{StatFetcher, StatOutcome};
pub use users::{SearchOutcome, UserOption, UserSearch};
