//! One API Client Library
//!
//! Provides a typed HTTP client for the administrative endpoints of a One API
//! relay server: usage logs and their aggregate statistics, users, tokens and
//! public site information.
//!
//! # Example
//!
//! ```rust,no_run
//! use oneapi_client::{LogFilter, LogQuery, OneApiClient, Scope, StatQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OneApiClient::with_access_token("http://localhost:3000", "my-access-token")?;
//!
//!     // First page of everyone's logs, ten rows per page
//!     let query = LogQuery::new(Scope::Admin, LogFilter::default(), 0, 10);
//!     let logs = client.get_logs(&query).await?;
//!
//!     // Totals for the same filters
//!     let stat = client
//!         .get_log_stat(&StatQuery::new(Scope::Admin, LogFilter::default()))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides an in-process mock backend:
//!
//! ```rust,ignore
//! use oneapi_client::testing::{sample_logs, MockOneApi};
//!
//! let mock = MockOneApi::new().with_logs(sample_logs(25));
//! let server = mock.serve().await?;
//! let logs = server.client.get_logs(&query).await?;
//! ```

mod client;
mod error;
pub mod query;
pub mod testing;

pub use client::OneApiClient;
pub use error::{OneApiError, Result};
pub use query::{LogQuery, StatQuery};

// Re-export core types for convenience
pub use oneapi_core::{
    DailyModelStat, LogEntry, LogFilter, LogType, Scope, SortColumn, SortOrder, StatSnapshot,
    SystemStatus, Token, TokenForm, TokenStatus, UserDetail, UserSummary,
};
