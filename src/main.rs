//! Cursor Journal - Export the day's Cursor AI conversations for journaling.
//!
//! Reads Cursor's `SQLite` state database read-only, keeps the conversations
//! active on the target day, collapses saved checkpoints, and prints them as
//! JSON or a summary. The `journal` command hands that export to an external
//! agent which appends entries to a dated journal file, then commits.
//!
//!   cursor-journal                           # today's conversations as JSON
//!   cursor-journal --format summary          # human-readable overview
//!   cursor-journal --date 2025-03-10         # another day
//!   cursor-journal journal                   # run the agent and commit
//!   cursor-journal journal --dry-run         # show the prompt only

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    extract_conversations, format_stats, render, render_prompt, Extraction, JournalOutcome,
    JournalService, OutputFormat, DEFAULT_PROMPT,
};
use cli::{Cli, Commands};
use domain::{AppConfig, AppError, ExtractConfig};
use infrastructure::{
    default_store_path, ensure_config_exists, load_config, load_prompt_template, AgentPublisher,
};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;
    let date = cli
        .target_date(Local::now().date_naive())
        .map_err(|e| AppError::Config { message: e })?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);

    match cli.command.clone().unwrap_or(Commands::Extract) {
        Commands::InitConfig => cmd_init_config(&config_path),
        Commands::Extract => {
            let (_, extract) = prepare(&cli, &config_path, date)?;
            cmd_extract(&extract, format, cli.stats)
        }
        Commands::Journal { dry_run } => {
            let (config, extract) = prepare(&cli, &config_path, date)?;
            cmd_journal(&extract, &config, dry_run, cli.stats)
        }
        Commands::Paths => {
            let (config, extract) = prepare(&cli, &config_path, date)?;
            cmd_paths(&extract.store_path, &config_path, &config, date);
            Ok(())
        }
    }
}

/// Loads the config file and builds the run configuration.
fn prepare(
    cli: &Cli,
    config_path: &Path,
    date: NaiveDate,
) -> domain::Result<(AppConfig, ExtractConfig)> {
    let config = load_config(Some(config_path))?;
    let store_path = resolve_store_path(cli.store.as_deref(), &config)?;
    let extract = ExtractConfig::new(&store_path, date, &config);
    Ok((config, extract))
}

/// Store path precedence: `--store`, then the config file, then discovery.
fn resolve_store_path(flag: Option<&Path>, config: &AppConfig) -> domain::Result<PathBuf> {
    match flag.or(config.store.path.as_deref()) {
        Some(path) => Ok(path.to_path_buf()),
        None => default_store_path(),
    }
}

/// Print the day's conversations.
fn cmd_extract(
    extract: &ExtractConfig,
    format: OutputFormat,
    show_stats: bool,
) -> domain::Result<()> {
    let extraction = extract_conversations(extract, &Local)?;

    // Render fully before writing so a failure leaves stdout untouched
    let output = render(&extraction.conversations, format, &Local)?;

    report(&extraction, show_stats);
    write_stdout(&output)
}

/// Run the journaling agent on the day's export.
fn cmd_journal(
    extract: &ExtractConfig,
    config: &AppConfig,
    dry_run: bool,
    show_stats: bool,
) -> domain::Result<()> {
    let extraction = extract_conversations(extract, &Local)?;
    report(&extraction, show_stats);

    let date = extract.date;
    let journal_file = config.journal_file(date);
    let template = load_prompt_template(config.journal.prompt_file.as_deref(), DEFAULT_PROMPT)?;

    if dry_run {
        println!("{}", render_prompt(&template, date, &journal_file));
        println!(
            "{} {} conversation(s) would be sent (dry run)",
            "ℹ".blue(),
            extraction.conversations.len()
        );
        return Ok(());
    }

    let publisher = AgentPublisher::from_config(config, &format!("journal: {date}"));
    let outcome = JournalService::new(publisher).run(
        &extraction.conversations,
        date,
        &journal_file,
        &template,
    )?;

    match outcome {
        JournalOutcome::NothingToPublish => {
            println!("No conversations found for {date}, journal unchanged.");
        }
        JournalOutcome::Published(published) => {
            if !published.completion.is_empty() {
                println!("{}", published.completion);
            }
            println!(
                "{} Journaled {} conversation(s) to {}{}",
                "✓".green().bold(),
                extraction.conversations.len(),
                journal_file.display(),
                if published.committed { " (committed)" } else { "" }
            );
        }
    }

    Ok(())
}

/// Show the resolved paths.
fn cmd_paths(store_path: &Path, config_path: &Path, config: &AppConfig, date: NaiveDate) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Item", "Path", "Exists"]);

    let journal_dir = config.journal_dir();
    let journal_file = config.journal_file(date);
    let rows: [(&str, &Path); 4] = [
        ("store", store_path),
        ("config", config_path),
        ("journal dir", &journal_dir),
        ("journal file", &journal_file),
    ];

    for (label, path) in rows {
        let exists = if path.exists() { "yes" } else { "no" };
        table.add_row(vec![label, &path.display().to_string(), exists]);
    }

    println!("{table}");
}

/// Write the default config file.
fn cmd_init_config(config_path: &Path) -> domain::Result<()> {
    if ensure_config_exists(config_path)? {
        println!("{} Created {}", "✓".green().bold(), config_path.display());
    } else {
        println!("Config already exists: {}", config_path.display());
    }
    Ok(())
}

/// Per-record problems go to stderr; they never fail the run.
fn report(extraction: &Extraction, show_stats: bool) {
    let skipped = extraction.stats.decode_errors;
    if skipped > 0 {
        eprintln!(
            "{} {skipped} record(s) skipped due to decode errors",
            "⚠".yellow().bold()
        );
    }

    if show_stats {
        eprintln!("{}", format_stats(&extraction.stats));
    }
}

/// Writes `output` to stdout in one call, newline-terminated.
fn write_stdout(output: &str) -> domain::Result<()> {
    let mut stdout = std::io::stdout().lock();
    let newline = if output.ends_with('\n') { "" } else { "\n" };
    write!(stdout, "{output}{newline}").map_err(|e| AppError::io("Failed to write output", e))?;
    stdout
        .flush()
        .map_err(|e| AppError::io("Failed to write output", e))
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout carries the export
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
