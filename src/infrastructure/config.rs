//! Configuration file management.
//!
//! Handles loading and creating the TOML configuration file.

use std::fs;
use std::path::Path;

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# cursor-journal configuration
# Auto-generated - edit as needed

[store]
# Path to Cursor's state.vscdb (discovered automatically when unset)
# path = "/home/me/.config/Cursor/User/globalStorage/state.vscdb"

# Milliseconds SQLite waits on a locked store per attempt
busy_timeout_ms = 2000

# Extra attempts when the store is locked by Cursor
open_retries = 3
retry_delay_ms = 250

[dedupe]
# Conversations without an id that share a title and were created within
# this many seconds are treated as one (0 disables)
title_window_secs = 60

[journal]
# Journal repository (defaults to ~/journal)
# dir = "/home/me/journal"

# File name for each day, as a chrono format string
file_pattern = "%Y-%m-%d.md"

# Agent invoked with the prompt as its last argument
agent_command = "cursor-agent"
agent_args = ["--print"]

# Custom prompt template; placeholders: {date} {journal_file} {data_file}
# prompt_file = "/home/me/.config/cursor-journal/prompt.md"

# Commit and push the journal directory after the agent succeeds
commit = true
push = true
"#;

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let default_path = AppConfig::default_config_path();
    let config_path = path.unwrap_or(default_path.as_path());

    if config_path.exists() {
        load_config_from_file(config_path)
    } else {
        tracing::debug!(path = %config_path.display(), "No config file, using defaults");
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns `true` when a file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %config_path.display(), "Created default configuration");

    Ok(true)
}

/// Load the prompt template, falling back to `default` when no file is set.
///
/// # Errors
/// Returns error if the configured file cannot be read.
pub fn load_prompt_template(path: Option<&Path>, default: &str) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            AppError::io(format!("Failed to read prompt template: {}", path.display()), e)
        }),
        None => Ok(default.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.store.busy_timeout_ms, 2000);
        assert_eq!(config.dedupe.title_window_secs, 60);
        assert_eq!(config.journal.agent_command, "cursor-agent");
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let config = load_config(Some(absent.as_path())).unwrap();
        assert_eq!(config.store.open_retries, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[journal]\npush = false\n").unwrap();

        let config = load_config_from_file(&path).unwrap();
        assert!(!config.journal.push);
        assert!(config.journal.commit);
        assert_eq!(config.journal.file_pattern, "%Y-%m-%d.md");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store\nbusy").unwrap();

        assert!(matches!(
            load_config_from_file(&path),
            Err(AppError::Config { .. })
        ));
    }

    #[test]
    fn test_ensure_config_exists_writes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(ensure_config_exists(&path).unwrap());
        assert!(!ensure_config_exists(&path).unwrap());

        let loaded = load_config_from_file(&path).unwrap();
        assert_eq!(loaded.journal.agent_args, vec!["--print".to_string()]);
    }

    #[test]
    fn test_load_prompt_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "custom {date}").unwrap();

        assert_eq!(load_prompt_template(None, "builtin").unwrap(), "builtin");
        assert_eq!(
            load_prompt_template(Some(path.as_path()), "builtin").unwrap(),
            "custom {date}"
        );
        assert!(load_prompt_template(Some(dir.path().join("nope").as_path()), "x").is_err());
    }
}
