//! Command implementations for oneapi-cli

pub mod logs;
pub mod settings;
pub mod site;
pub mod tokens;
pub mod users;

pub use logs::{logs, stat, FilterArgs, LogsArgs};
pub use settings::{set_page_size, settings_show};
pub use site::{about, channel_models, dashboard, models, status};
pub use tokens::{
    tokens_create, tokens_delete, tokens_list, tokens_search, tokens_show, tokens_update,
    TokenFields,
};
pub use users::{users_search, users_show, whoami};
