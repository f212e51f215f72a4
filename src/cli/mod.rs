//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// Cursor Journal - Export the day's Cursor AI conversations and journal them.
///
/// Without a subcommand, prints the conversations active on the target day.
#[derive(Parser, Debug)]
#[command(name = "cursor-journal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Target day as YYYY-MM-DD (default: today, local time).
    #[arg(short, long, global = true)]
    pub date: Option<String>,

    /// Output format: json or summary.
    #[arg(short, long, default_value = "json", global = true)]
    pub format: String,

    /// Path to Cursor's state.vscdb (overrides config and discovery).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Path to the config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print extraction statistics to stderr.
    #[arg(long, global = true)]
    pub stats: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the day's conversations (the default).
    Extract,

    /// Hand the day's export to the journaling agent, then commit.
    Journal {
        /// Print the rendered prompt instead of running the agent.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the store, config and journal paths being used.
    Paths,

    /// Write a default config file if none exists.
    InitConfig,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }

    /// Parse the target date, defaulting to `today`.
    pub fn target_date(&self, today: NaiveDate) -> Result<NaiveDate, String> {
        self.date.as_deref().map_or(Ok(today), |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| format!("Invalid date format: {s} (expected YYYY-MM-DD)"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["cursor-journal"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.output_format(), Ok(OutputFormat::Json));
        assert_eq!(cli.target_date(today()), Ok(today()));
    }

    #[test]
    fn test_date_and_format() {
        let cli =
            Cli::try_parse_from(["cursor-journal", "--date", "2025-03-10", "--format", "summary"])
                .unwrap();
        assert_eq!(
            cli.target_date(today()),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
        assert_eq!(cli.output_format(), Ok(OutputFormat::Summary));
    }

    #[test]
    fn test_invalid_date() {
        let cli = Cli::try_parse_from(["cursor-journal", "--date", "10/03/2025"]).unwrap();
        assert!(cli.target_date(today()).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cursor-journal",
            "journal",
            "--dry-run",
            "--store",
            "/tmp/state.vscdb",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Journal { dry_run: true }));
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/state.vscdb")));
    }
}
