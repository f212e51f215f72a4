//! Application layer - use cases and orchestration.
//!
//! This layer contains the extraction pipeline stages and the journal
//! use case built on top of them.

pub mod date_filter;
pub mod dedupe;
pub mod extractor;
pub mod formatter;
pub mod journal;
pub mod normalizer;

pub use extractor::{extract_conversations, Extraction};
pub use formatter::{format_stats, render, OutputFormat};
pub use journal::{render_prompt, JournalOutcome, JournalService, DEFAULT_PROMPT};
