//! oneapi-cli - Command-line console for a One API deployment
//!
//! Browses usage logs page by page, reveals aggregate statistics, and manages
//! API tokens against a One API server.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use oneapi_browser::Settings;
use oneapi_client::OneApiClient;
use oneapi_core::Scope;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::{FilterArgs, LogsArgs, TokenFields};
use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "oneapi-cli")]
#[command(author, version, about = "One API console")]
#[command(propagate_version = true)]
struct Cli {
    /// Server URL [default: http://localhost:3000]
    #[arg(short, long, env = "ONEAPI_SERVER")]
    server: Option<String>,

    /// Access token
    #[arg(short, long, env = "ONEAPI_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "ONEAPI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Which logs to browse: auto asks the server for the account's role
    #[arg(long, value_parser = ["auto", "admin", "self"])]
    scope: Option<String>,

    /// Persisted console settings file
    #[arg(long, env = "ONEAPI_SETTINGS")]
    settings_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse usage logs
    Logs(LogsArgs),

    /// Show aggregate quota and tokens for the filtered logs
    Stat(FilterArgs),

    /// Look up users
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },

    /// Show the account behind the access token
    Whoami,

    /// Manage API tokens
    Tokens {
        #[command(subcommand)]
        command: TokensCommand,
    },

    /// List models available to the current account
    Models,

    /// List models offered by each channel type
    ChannelModels,

    /// Show per-day, per-model usage
    Dashboard,

    /// Show the site's about content
    About,

    /// Show site status and store its display settings
    Status,

    /// Show or change persisted console settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    /// Search users by username (admin only)
    Search {
        /// Keyword to match
        keyword: String,
    },

    /// Show one user's details
    Show {
        /// User ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum TokensCommand {
    /// List tokens page by page
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
        page: u64,

        /// Server-side ordering, e.g. remain_quota or used_quota
        #[arg(long)]
        order: Option<String>,
    },

    /// Search tokens by name
    Search {
        /// Keyword to match
        keyword: String,
    },

    /// Show one token
    Show {
        /// Token ID
        id: i64,
    },

    /// Create a token
    Create {
        #[command(flatten)]
        fields: TokenFields,
    },

    /// Update a token; omitted fields keep their current value
    Update {
        /// Token ID
        id: i64,

        #[command(flatten)]
        fields: TokenFields,
    },

    /// Delete a token
    Delete {
        /// Token ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print every stored setting
    Show,

    /// Store the number of log rows per page
    SetPageSize {
        /// Rows per page
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        size: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(ArgOverrides {
        server: cli.server.as_deref(),
        token: cli.token.as_deref(),
        output: cli.output.map(|format| format.into()),
        no_color: cli.no_color,
        scope: cli.scope.as_deref(),
        settings_file: cli.settings_file.as_deref(),
    })?;

    let format = OutputFormat::from_str(&merged.output, true)
        .map_err(|e| anyhow!("Invalid output format '{}': {}", merged.output, e))?;
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);

    let settings = Settings::open(&merged.settings_file).with_context(|| {
        format!(
            "Failed to open settings file: {}",
            merged.settings_file.display()
        )
    })?;
    debug!(path = %merged.settings_file.display(), "Opened settings");

    // Settings commands never touch the server
    if let Commands::Settings { command } = &cli.command {
        return match command {
            SettingsCommand::Show => commands::settings_show(&settings, &ctx),
            SettingsCommand::SetPageSize { size } => {
                commands::set_page_size(&settings, *size as usize, &ctx)
            }
        };
    }

    let client = create_client(&merged.server, merged.token.as_deref())?;

    // Execute command
    match &cli.command {
        Commands::Logs(args) => {
            let scope = resolve_scope(&client, &merged.scope).await?;
            commands::logs(&client, scope, &settings, args, &ctx).await?;
        }

        Commands::Stat(filters) => {
            let scope = resolve_scope(&client, &merged.scope).await?;
            commands::stat(&client, scope, &settings, filters, &ctx).await?;
        }

        Commands::Users { command } => match command {
            UsersCommand::Search { keyword } => {
                let scope = resolve_scope(&client, &merged.scope).await?;
                commands::users_search(&client, scope, keyword, &ctx).await?;
            }
            UsersCommand::Show { id } => {
                commands::users_show(&client, *id, &settings, &ctx).await?;
            }
        },

        Commands::Whoami => {
            commands::whoami(&client, &settings, &ctx).await?;
        }

        Commands::Tokens { command } => match command {
            TokensCommand::List { page, order } => {
                let page = (*page - 1) as usize;
                commands::tokens_list(&client, page, order.as_deref(), &settings, &ctx).await?;
            }
            TokensCommand::Search { keyword } => {
                commands::tokens_search(&client, keyword, &settings, &ctx).await?;
            }
            TokensCommand::Show { id } => {
                commands::tokens_show(&client, *id, &settings, &ctx).await?;
            }
            TokensCommand::Create { fields } => {
                commands::tokens_create(&client, fields, &ctx).await?;
            }
            TokensCommand::Update { id, fields } => {
                commands::tokens_update(&client, *id, fields, &ctx).await?;
            }
            TokensCommand::Delete { id } => {
                commands::tokens_delete(&client, *id, &ctx).await?;
            }
        },

        Commands::Models => {
            commands::models(&client, &ctx).await?;
        }

        Commands::ChannelModels => {
            commands::channel_models(&client, &settings, &ctx).await?;
        }

        Commands::Dashboard => {
            commands::dashboard(&client, &settings, &ctx).await?;
        }

        Commands::About => {
            commands::about(&client, &settings, &ctx).await?;
        }

        Commands::Status => {
            commands::status(&client, &settings, &ctx).await?;
        }

        Commands::Settings { .. } => {}
    }

    Ok(())
}

fn create_client(server: &str, token: Option<&str>) -> Result<OneApiClient> {
    match token {
        Some(token) => OneApiClient::with_access_token(server, token),
        None => OneApiClient::new(server),
    }
    .with_context(|| format!("Failed to create client for {}", server))
}

/// Turn the configured scope into the log endpoints to use
async fn resolve_scope(client: &OneApiClient, scope: &str) -> Result<Scope> {
    if scope != "auto" {
        return scope.parse().context("Invalid scope");
    }
    let user = client
        .get_self()
        .await
        .context("Failed to look up the current user; pass --scope to skip")?;
    debug!(role = user.role, scope = %user.scope(), "Resolved scope");
    Ok(user.scope())
}

impl From<OutputFormat> for &str {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_logs_flags_parse() {
        let cli = Cli::try_parse_from([
            "oneapi-cli",
            "--scope",
            "admin",
            "logs",
            "--type",
            "consumption",
            "--sort-by",
            "quota",
            "--order",
            "asc",
            "--page",
            "3",
            "--page-size",
            "20",
        ])
        .unwrap();

        assert_eq!(cli.scope.as_deref(), Some("admin"));
        match cli.command {
            Commands::Logs(args) => {
                assert_eq!(args.page, 3);
                assert_eq!(args.page_size, Some(20));
            }
            _ => panic!("expected logs"),
        }
    }

    #[test]
    fn test_page_zero_rejected() {
        assert!(Cli::try_parse_from(["oneapi-cli", "logs", "--page", "0"]).is_err());
    }

    #[test]
    fn test_bad_scope_rejected() {
        assert!(Cli::try_parse_from(["oneapi-cli", "--scope", "root", "whoami"]).is_err());
    }
}
