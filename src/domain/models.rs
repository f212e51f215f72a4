//! Domain models for extracted Cursor conversations.
//!
//! These models represent the normalized entities built from Cursor's `SQLite`
//! key/value store. They serialize with every field present so the export can
//! be parsed against a fixed shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when neither the store nor the messages provide one.
pub const UNTITLED: &str = "Untitled conversation";

/// Undecoded key/value entry as stored in `cursorDiskKV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub key: String,
    pub value: Vec<u8>,
}

impl RawRecord {
    /// Creates a record from a key and its raw value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user (human).
    User,
    /// Message from the AI assistant.
    Assistant,
    /// Tool output, system notices and bubble types we do not recognise.
    System,
}

impl Role {
    /// Maps Cursor's numeric bubble type.
    #[must_use]
    pub const fn from_bubble_type(value: u8) -> Self {
        match value {
            1 => Self::User,
            2 => Self::Assistant,
            _ => Self::System,
        }
    }

    /// Maps the string roles used by older chat records.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "user" | "human" => Self::User,
            "ai" | "assistant" | "bot" => Self::Assistant,
            _ => Self::System,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Which historical composer layout a record was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Bubble headers in the composer, bodies in separate `bubbleId:` records.
    Headers,
    /// Legacy composer with the whole conversation inline.
    Inline,
    /// Composer document without any conversation data.
    Metadata,
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headers => write!(f, "headers"),
            Self::Inline => write!(f, "inline"),
            Self::Metadata => write!(f, "metadata"),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Prose followed by any fenced code blocks the message carried.
    pub content: String,
    /// Not every record vintage stores per-message times.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A normalized conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Composer id; empty when the record carried none.
    pub id: String,
    pub title: String,
    /// Messages in the order the store embedded them.
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    /// Never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
    /// Project directory recovered from file references, if any.
    pub workspace: Option<String>,
    pub model: Option<String>,
    pub status: Option<String>,
    pub schema: SchemaVersion,
}

impl Conversation {
    /// Get total message count.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Text of the first user message, if there is one with content.
    #[must_use]
    pub fn first_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User && !m.content.trim().is_empty())
            .map(|m| m.content.as_str())
    }
}

/// Counters collected while running the extraction pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Conversation records read from the store.
    pub records_read: usize,
    /// Records skipped because they failed to decode.
    pub decode_errors: usize,
    /// Messages whose body record was missing or unreadable.
    pub missing_bodies: usize,
    /// Conversations normalized before date filtering.
    pub normalized: usize,
    /// Conversations active on the target day.
    pub in_range: usize,
    /// Checkpoints collapsed into another variant.
    pub duplicates_collapsed: usize,
    /// Conversations in the final export.
    pub emitted: usize,
}
