//! Shared data models for the One API backend

mod log;
mod stat;
mod status;
mod token;
mod user;

pub use log::*;
pub use stat::*;
pub use status::*;
pub use token::*;
pub use user::*;
