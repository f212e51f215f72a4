//! Output formatting for extracted conversations.
//!
//! JSON is the hand-off format for the journaling agent; the summary is for
//! reading in a terminal.

use chrono::TimeZone;
use colored::Colorize;

use crate::domain::{AppError, Conversation, ExtractionStats, Result};

/// Longest first-message preview in summary mode.
const PREVIEW_CHARS: usize = 100;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON array for the downstream agent.
    #[default]
    Json,
    /// Plain-text overview.
    Summary,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("Unknown format: {s}. Use: json, summary")),
        }
    }
}

/// Renders conversations in the requested format.
///
/// # Errors
/// Returns `Format` if JSON serialization fails.
pub fn render<Tz: TimeZone>(
    conversations: &[Conversation],
    format: OutputFormat,
    tz: &Tz,
) -> Result<String>
where
    Tz::Offset: std::fmt::Display,
{
    match format {
        OutputFormat::Json => format_json(conversations),
        OutputFormat::Summary => Ok(format_summary(conversations, tz)),
    }
}

/// Formats conversations as a pretty JSON array.
///
/// # Errors
/// Returns `Format` if serialization fails.
pub fn format_json(conversations: &[Conversation]) -> Result<String> {
    serde_json::to_string_pretty(conversations).map_err(|e| AppError::format(&e))
}

/// Formats a human-readable overview, times shown in `tz`.
pub fn format_summary<Tz: TimeZone>(conversations: &[Conversation], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if conversations.is_empty() {
        return "No conversations found for the specified date.\n".to_string();
    }

    let mut out = format!("Found {} conversation(s):\n\n", conversations.len());

    for conv in conversations {
        let start = conv.created_at.with_timezone(tz).format("%H:%M");
        let end = conv.updated_at.with_timezone(tz).format("%H:%M");
        out.push_str(&format!("[{start}-{end}] {}\n", conv.title));

        out.push_str(&format!(
            "  Messages: {} | Model: {} | Status: {}\n",
            conv.message_count(),
            conv.model.as_deref().unwrap_or("unknown"),
            conv.status.as_deref().unwrap_or("unknown"),
        ));

        if let Some(first) = conv.first_user_message() {
            out.push_str(&format!("  First message: {}\n", truncate(first, PREVIEW_CHARS)));
        }

        if let Some(ref workspace) = conv.workspace {
            out.push_str(&format!("  Workspace: {workspace}\n"));
        }

        out.push('\n');
    }

    out
}

/// Formats extraction statistics for display.
pub fn format_stats(stats: &ExtractionStats) -> String {
    format!(
        "{}\n  Records read: {}\n  Decode errors: {}\n  Missing message bodies: {}\n  Active on date: {}\n  Duplicates collapsed: {}\n  Exported: {}",
        "📊 Extraction".bold(),
        stats.records_read.to_string().cyan(),
        stats.decode_errors.to_string().red(),
        stats.missing_bodies.to_string().yellow(),
        stats.in_range.to_string().cyan(),
        stats.duplicates_collapsed.to_string().blue(),
        stats.emitted.to_string().green()
    )
}

/// Single-line preview capped at `max_chars` characters.
fn truncate(s: &str, max_chars: usize) -> String {
    let line = s.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, Role, SchemaVersion};
    use chrono::{DateTime, FixedOffset, Utc};

    fn sample() -> Conversation {
        Conversation {
            id: "c1".into(),
            title: "Wire up the CLI".into(),
            messages: vec![
                Message {
                    role: Role::User,
                    content: "Add a --date flag\nplease".into(),
                    timestamp: DateTime::from_timestamp(1_700_000_000, 0),
                },
                Message {
                    role: Role::Assistant,
                    content: "Done".into(),
                    timestamp: None,
                },
            ],
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated_at: DateTime::from_timestamp(1_700_003_600, 0).unwrap(),
            workspace: Some("/home/me/workspace/cli".into()),
            model: Some("gpt-5".into()),
            status: None,
            schema: SchemaVersion::Headers,
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world!", 5), "hello...");
        assert_eq!(truncate("\n  first\nsecond", 10), "first");
        assert_eq!(truncate("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("Summary".parse::<OutputFormat>(), Ok(OutputFormat::Summary));
        assert!("markdown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_empty_outputs() {
        assert_eq!(format_json(&[]).unwrap(), "[]");
        assert_eq!(
            format_summary(&[], &Utc),
            "No conversations found for the specified date.\n"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let input = vec![sample()];
        let json = format_json(&input).unwrap();
        let parsed: Vec<Conversation> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, input);
    }

    #[test]
    fn test_json_has_fixed_fields() {
        let json = format_json(&[sample()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let obj = &value[0];
        assert!(obj["status"].is_null());
        assert_eq!(obj["messages"][0]["role"], "user");
        assert!(obj["messages"][1]["timestamp"].is_null());
        assert_eq!(obj["created_at"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_summary_block() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let out = format_summary(&[sample()], &tz);

        assert!(out.starts_with("Found 1 conversation(s):"));
        assert!(out.contains("[23:13-00:13] Wire up the CLI"));
        assert!(out.contains("Messages: 2 | Model: gpt-5 | Status: unknown"));
        assert!(out.contains("First message: Add a --date flag\n"));
        assert!(out.contains("Workspace: /home/me/workspace/cli"));
    }
}
