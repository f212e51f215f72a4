//! Conversation extraction pipeline.
//!
//! Orchestrates read → normalize → filter → dedupe for one target day.

use chrono::TimeZone;

use crate::domain::{AppError, Conversation, ExtractConfig, ExtractionStats, RawRecord, Result};
use crate::infrastructure::StoreReader;

use super::date_filter::{filter_by_day, DayWindow};
use super::dedupe::dedupe;
use super::normalizer::{normalize_records, BubbleIndex};

/// Result of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub conversations: Vec<Conversation>,
    pub stats: ExtractionStats,
}

/// Extracts the conversations active on `config.date` from the store.
///
/// The store handle lives only for the duration of the read.
///
/// # Errors
/// Returns `StoreUnavailable` if the store cannot be opened, or
/// `StoreUndecodable` if it holds conversation records and none decode.
pub fn extract_conversations<Tz: TimeZone>(config: &ExtractConfig, tz: &Tz) -> Result<Extraction> {
    tracing::info!("Extracting from: {}", config.store_path.display());

    let (composers, bubbles) = {
        let reader = StoreReader::open(&config.store_path, &config.store)?;
        (reader.fetch_composers()?, reader.fetch_bubbles()?)
    };

    process_records(&composers, &bubbles, config, tz)
}

/// Runs the in-memory stages over already fetched records.
///
/// # Errors
/// Returns `StoreUndecodable` if there are composer records and none decode.
pub fn process_records<Tz: TimeZone>(
    composers: &[RawRecord],
    bubbles: &[RawRecord],
    config: &ExtractConfig,
    tz: &Tz,
) -> Result<Extraction> {
    let mut stats = ExtractionStats {
        records_read: composers.len(),
        ..Default::default()
    };

    let index = BubbleIndex::build(bubbles);
    tracing::debug!("Indexed {} message bodies", index.len());

    let normalized = normalize_records(composers, &index);
    stats.decode_errors = normalized.decode_errors;
    stats.missing_bodies = normalized.missing_bodies;
    stats.normalized = normalized.conversations.len();

    if stats.records_read > 0 && stats.normalized == 0 {
        return Err(AppError::StoreUndecodable {
            total: stats.records_read,
        });
    }

    let window = DayWindow::for_date(config.date, tz);
    let in_range = filter_by_day(normalized.conversations, &window);
    stats.in_range = in_range.len();

    let conversations = dedupe(in_range, &config.dedupe);
    stats.duplicates_collapsed = stats.in_range - conversations.len();
    stats.emitted = conversations.len();

    tracing::info!(
        "Extracted {} conversations for {} ({} records, {} skipped, {} duplicates)",
        stats.emitted,
        config.date,
        stats.records_read,
        stats.decode_errors,
        stats.duplicates_collapsed
    );

    Ok(Extraction {
        conversations,
        stats,
    })
}
