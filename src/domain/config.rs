//! Configuration types.
//!
//! `AppConfig` mirrors the TOML file. `ExtractConfig` is the immutable value
//! handed to the extraction pipeline once CLI flags and file values have been
//! merged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

/// Store access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit path to `state.vscdb`. Discovered when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How long `SQLite` waits on a locked database per attempt.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Extra attempts to open a busy store.
    #[serde(default = "default_open_retries")]
    pub open_retries: u32,

    /// Pause between open attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            open_retries: default_open_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

const fn default_busy_timeout_ms() -> u64 {
    2000
}

const fn default_open_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    250
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Id-less conversations with the same title created within this many
    /// seconds of each other are one conversation. `0` disables the match.
    #[serde(default = "default_title_window_secs")]
    pub title_window_secs: u64,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            title_window_secs: default_title_window_secs(),
        }
    }
}

const fn default_title_window_secs() -> u64 {
    60
}

/// Journaling agent and git configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Journal repository. Defaults to `~/journal`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// `chrono` format string for the day's journal file name.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Agent executable.
    #[serde(default = "default_agent_command")]
    pub agent_command: String,

    /// Arguments placed before the prompt.
    #[serde(default = "default_agent_args")]
    pub agent_args: Vec<String>,

    /// Custom prompt template replacing the built-in one.
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    /// Commit the journal directory after the agent succeeds.
    #[serde(default = "default_true")]
    pub commit: bool,

    /// Push after committing.
    #[serde(default = "default_true")]
    pub push: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_pattern: default_file_pattern(),
            agent_command: default_agent_command(),
            agent_args: default_agent_args(),
            prompt_file: None,
            commit: true,
            push: true,
        }
    }
}

fn default_file_pattern() -> String {
    "%Y-%m-%d.md".into()
}

fn default_agent_command() -> String {
    "cursor-agent".into()
}

fn default_agent_args() -> Vec<String> {
    vec!["--print".into()]
}

const fn default_true() -> bool {
    true
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub dedupe: DedupeConfig,

    #[serde(default)]
    pub journal: JournalConfig,
}

impl AppConfig {
    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cursor-journal")
            .join("config.toml")
    }

    /// Get the journal directory, using default if not configured.
    #[must_use]
    pub fn journal_dir(&self) -> PathBuf {
        self.journal.dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("journal")
        })
    }

    /// Journal file for a given day.
    #[must_use]
    pub fn journal_file(&self, date: NaiveDate) -> PathBuf {
        self.journal_dir()
            .join(date.format(&self.journal.file_pattern).to_string())
    }

    /// Store open behaviour derived from the `[store]` section.
    #[must_use]
    pub const fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.store.busy_timeout_ms),
            open_retries: self.store.open_retries,
            retry_delay: Duration::from_millis(self.store.retry_delay_ms),
        }
    }

    /// Duplicate policy derived from the `[dedupe]` section.
    #[must_use]
    pub fn dedupe_policy(&self) -> DedupePolicy {
        let secs = i64::try_from(self.dedupe.title_window_secs).unwrap_or(i64::MAX);
        DedupePolicy {
            title_window: (secs > 0).then(|| TimeDelta::try_seconds(secs)).flatten(),
        }
    }
}

/// How the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub busy_timeout: Duration,
    pub open_retries: u32,
    pub retry_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        AppConfig::default().store_options()
    }
}

/// Rules for collapsing checkpoints of the same conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DedupePolicy {
    /// Matching window for conversations without an id. `None` keeps every
    /// id-less conversation separate.
    pub title_window: Option<TimeDelta>,
}

/// Everything the extraction pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub store_path: PathBuf,
    pub date: NaiveDate,
    pub store: StoreOptions,
    pub dedupe: DedupePolicy,
}

impl ExtractConfig {
    /// Builds the run configuration from file values.
    #[must_use]
    pub fn new(store_path: &Path, date: NaiveDate, config: &AppConfig) -> Self {
        Self {
            store_path: store_path.to_path_buf(),
            date,
            store: config.store_options(),
            dedupe: config.dedupe_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_policy_zero_disables() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.dedupe_policy().title_window,
            TimeDelta::try_seconds(60)
        );

        config.dedupe.title_window_secs = 0;
        assert_eq!(config.dedupe_policy().title_window, None);
    }

    #[test]
    fn test_journal_file_uses_pattern() {
        let mut config = AppConfig::default();
        config.journal.dir = Some(PathBuf::from("/tmp/j"));
        config.journal.file_pattern = "%Y/%m/%d.md".into();

        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(config.journal_file(date), PathBuf::from("/tmp/j/2025/03/09.md"));
    }

    #[test]
    fn test_store_options_from_config() {
        let options = AppConfig::default().store_options();
        assert_eq!(options.busy_timeout, Duration::from_millis(2000));
        assert_eq!(options.open_retries, 3);
    }
}
