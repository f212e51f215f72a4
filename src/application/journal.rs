//! Journal use case.
//!
//! Hands the day's export to a publisher together with the instruction
//! prompt. What the entries say, and whether a conversation was already
//! journaled, is the agent's business.

use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{Conversation, PublishOutcome, Publisher, Result};

use super::formatter::format_json;

/// Placeholder the publisher replaces with the export file path.
pub const DATA_FILE_PLACEHOLDER: &str = "{data_file}";

/// Built-in instruction prompt.
pub const DEFAULT_PROMPT: &str = r"You are maintaining a developer work journal.

Read the JSON export of today's ({date}) Cursor AI conversations at:
{data_file}

Journal file: {journal_file}

1. If the journal file does not exist, create it starting with the header `# {date}`.
2. Read the existing entries first. Skip any conversation that already has an entry
   (same title or clearly the same work). Never add an entry twice.
3. For every remaining conversation that represents meaningful work, append one entry
   using exactly this template:

   ## HH:MM - <title>
   - **Type:** feature | bugfix | refactor | infra | learning | planning
   - **Impact:** low | medium | high
   - **Context:** <project or workspace, and why the work was needed>
   - **Description:** <what was done, two to four sentences>
   - **AI assistance:** <how the assistant helped>

4. Skip trivial conversations (greetings, empty sessions, one-off lookups).
5. Only edit the journal file. Do not run git; committing happens afterwards.
";

/// What a journal run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalOutcome {
    /// No conversations for the day; the publisher was not called.
    NothingToPublish,
    /// The publisher ran.
    Published(PublishOutcome),
}

/// Fills in `{date}` and `{journal_file}`. `{data_file}` is left for the
/// publisher, which owns the export file.
#[must_use]
pub fn render_prompt(template: &str, date: NaiveDate, journal_file: &Path) -> String {
    template
        .replace("{date}", &date.format("%Y-%m-%d").to_string())
        .replace("{journal_file}", &journal_file.display().to_string())
}

/// Drives a publisher for one day.
pub struct JournalService<P: Publisher> {
    publisher: P,
}

impl<P: Publisher> JournalService<P> {
    /// Create a new journal service.
    #[must_use]
    pub const fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Publishes `conversations` unless there are none.
    ///
    /// # Errors
    /// Returns error if formatting or publishing fails.
    pub fn run(
        &self,
        conversations: &[Conversation],
        date: NaiveDate,
        journal_file: &Path,
        template: &str,
    ) -> Result<JournalOutcome> {
        if conversations.is_empty() {
            tracing::info!("No conversations for {}, nothing to journal", date);
            return Ok(JournalOutcome::NothingToPublish);
        }

        let export = format_json(conversations)?;
        let prompt = render_prompt(template, date, journal_file);

        tracing::info!(
            "Publishing {} conversation(s) to {}",
            conversations.len(),
            journal_file.display()
        );

        self.publisher
            .publish(&export, &prompt)
            .map(JournalOutcome::Published)
    }
}
