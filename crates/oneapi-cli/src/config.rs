//! Configuration file handling for oneapi-cli

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server used when neither flag, environment nor config names one
pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default server URL
    pub server: Option<String>,
    /// Access token sent as a bearer token
    pub token: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Log scope: auto, admin or self
    pub scope: Option<String>,
    /// Where console settings are persisted
    pub settings_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("oneapi-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Default location of the persisted console settings
    pub fn default_settings_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Could not determine data directory")?
            .join("oneapi-cli");

        Ok(data_dir.join("settings.json"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: ArgOverrides<'_>) -> Result<MergedConfig> {
        let settings_file = match args.settings_file.or(self.settings_file.as_deref()) {
            Some(path) => path.to_path_buf(),
            None => Self::default_settings_path()?,
        };

        Ok(MergedConfig {
            server: args
                .server
                .map(String::from)
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            token: args
                .token
                .map(String::from)
                .or_else(|| self.token.clone())
                .filter(|t| !t.is_empty()),
            output: args
                .output
                .map(String::from)
                .or_else(|| self.output.clone())
                .unwrap_or_else(|| "table".to_string()),
            no_color: args.no_color || self.no_color.unwrap_or(false),
            scope: args
                .scope
                .map(String::from)
                .or_else(|| self.scope.clone())
                .unwrap_or_else(|| "auto".to_string()),
            settings_file,
        })
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgOverrides<'a> {
    pub server: Option<&'a str>,
    pub token: Option<&'a str>,
    pub output: Option<&'a str>,
    pub no_color: bool,
    pub scope: Option<&'a str>,
    pub settings_file: Option<&'a Path>,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub token: Option<String>,
    pub output: String,
    pub no_color: bool,
    pub scope: String,
    pub settings_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_args_win_over_file() {
        let config = Config {
            server: Some("http://file:3000".into()),
            token: Some("file-token".into()),
            scope: Some("self".into()),
            settings_file: Some(PathBuf::from("/tmp/file-settings.json")),
            ..Default::default()
        };
        let merged = config
            .merge_with_args(ArgOverrides {
                server: Some("http://flag:3000"),
                scope: Some("admin"),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.server, "http://flag:3000");
        assert_eq!(merged.token.as_deref(), Some("file-token"));
        assert_eq!(merged.scope, "admin");
        assert_eq!(merged.output, "table");
        assert_eq!(
            merged.settings_file,
            PathBuf::from("/tmp/file-settings.json")
        );
    }

    #[test]
    fn test_defaults() {
        let merged = Config::default()
            .merge_with_args(ArgOverrides {
                settings_file: Some(Path::new("s.json")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.server, DEFAULT_SERVER);
        assert_eq!(merged.token, None);
        assert_eq!(merged.scope, "auto");
        assert!(!merged.no_color);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server = \"http://relay:3000\"\ntoken = \"abc\"\nno_color = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.as_deref(), Some("http://relay:3000"));
        assert_eq!(config.no_color, Some(true));
    }
}
