//! Publisher port.
//!
//! A publisher turns a conversation export plus an instruction prompt into
//! persisted journal entries. The real implementation drives an external agent
//! and git; tests substitute a fake.

use super::Result;

/// What a successful publish produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Text the agent printed.
    pub completion: String,
    /// Whether a commit was created afterwards.
    pub committed: bool,
}

/// Turns an export into journal entries.
pub trait Publisher {
    /// Hands `export` (a JSON document) and `prompt` to the publisher.
    ///
    /// # Errors
    /// Returns error if the agent or the persistence step fails.
    fn publish(&self, export: &str, prompt: &str) -> Result<PublishOutcome>;
}
