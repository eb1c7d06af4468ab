//! oneapi-core - Shared domain models for One API console clients
//!
//! This crate holds the wire types returned by the One API backend (log rows,
//! aggregate statistics, users, tokens) together with the closed enumerations
//! the console uses to label them. It has no I/O; the HTTP client lives in
//! `oneapi-client` and the headless log browser in `oneapi-browser`.

pub mod envelope;
pub mod error;
pub mod models;

pub use envelope::Envelope;
pub use error::{CoreError, CoreResult};
pub use models::*;
