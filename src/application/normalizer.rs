//! Decoding and normalization of raw store records.
//!
//! Composer documents changed shape across Cursor releases. Each record is
//! decoded against the known layouts in turn and tagged with the one that
//! matched; anything that fits none of them is a per-record decode error.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::domain::{
    AppError, Conversation, Message, RawRecord, Result, Role, SchemaVersion, UNTITLED,
};
use crate::infrastructure::store_reader::{BUBBLE_PREFIX, COMPOSER_PREFIX};

/// Composer keys holding conversation data, newest layout first.
const HEADERS_KEY: &str = "fullConversationHeadersOnly";
const INLINE_KEY: &str = "conversation";

/// Epoch values below this are seconds, anything above is milliseconds.
const SECONDS_CUTOFF: i64 = 100_000_000_000;

/// Longest title derived from a message.
const MAX_TITLE_CHARS: usize = 80;

/// Timestamp in any of the encodings the store has used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StoreTime(Option<DateTime<Utc>>);

impl<'de> Deserialize<'de> for StoreTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(parse_timestamp(&value)))
    }
}

/// Metadata shared by every composer layout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposerMeta {
    #[serde(default)]
    composer_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: StoreTime,
    #[serde(default)]
    last_updated_at: StoreTime,
    #[serde(default)]
    model_config: Option<RawModelConfig>,
    #[serde(default)]
    code_block_data: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawModelConfig {
    #[serde(default)]
    model_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadersLayout {
    full_conversation_headers_only: Vec<RawHeader>,
}

#[derive(Debug, Deserialize)]
struct InlineLayout {
    conversation: Vec<RawBubble>,
}

/// Bubble reference in the headers layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeader {
    bubble_id: String,
    #[serde(rename = "type", default = "default_role", deserialize_with = "deserialize_role")]
    role: Role,
}

/// Message body, either inline or stored under a `bubbleId:` key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBubble {
    #[serde(rename = "type", default = "default_role", deserialize_with = "deserialize_role")]
    role: Role,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    rich_text: Option<String>,
    #[serde(default)]
    created_at: StoreTime,
    #[serde(default)]
    timing_info: Option<RawTimingInfo>,
    #[serde(default)]
    code_blocks: Vec<RawCodeBlock>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawTimingInfo {
    #[serde(default)]
    client_start_time: StoreTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCodeBlock {
    #[serde(default)]
    content: String,
    #[serde(default)]
    language_id: Option<String>,
}

const fn default_role() -> Role {
    Role::System
}

/// Accepts numeric bubble types and the string roles of older records.
fn deserialize_role<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Role, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .map_or(Role::System, Role::from_bubble_type),
        Value::String(s) => Role::from_label(&s),
        _ => Role::System,
    })
}

/// Conversation payload of a composer, tagged by layout.
#[derive(Debug)]
enum ComposerBody {
    Headers(Vec<RawHeader>),
    Inline(Vec<RawBubble>),
    Metadata,
}

impl ComposerBody {
    const fn schema(&self) -> SchemaVersion {
        match self {
            Self::Headers(_) => SchemaVersion::Headers,
            Self::Inline(_) => SchemaVersion::Inline,
            Self::Metadata => SchemaVersion::Metadata,
        }
    }
}

/// A composer record that matched one of the known layouts.
#[derive(Debug)]
pub struct DecodedComposer {
    key: String,
    meta: ComposerMeta,
    body: ComposerBody,
}

impl DecodedComposer {
    /// Layout the record matched.
    #[must_use]
    pub const fn schema(&self) -> SchemaVersion {
        self.body.schema()
    }
}

/// Decodes a composer record against each known layout in turn.
///
/// # Errors
/// Returns `RecordDecode` if the value is not JSON or fits no layout.
pub fn decode_composer(record: &RawRecord) -> Result<DecodedComposer> {
    let value: Value = serde_json::from_slice(&record.value)
        .map_err(|e| AppError::record_decode(&record.key, format!("malformed JSON: {e}")))?;

    if !value.is_object() {
        return Err(AppError::record_decode(&record.key, "not a JSON object"));
    }

    let meta = ComposerMeta::deserialize(&value)
        .map_err(|e| AppError::record_decode(&record.key, format!("metadata: {e}")))?;

    let body = decode_body(&value).map_err(|e| AppError::record_decode(&record.key, e))?;

    Ok(DecodedComposer {
        key: record.key.clone(),
        meta,
        body,
    })
}

fn decode_body(value: &Value) -> std::result::Result<ComposerBody, String> {
    let mut failures = Vec::new();

    match HeadersLayout::deserialize(value) {
        Ok(layout) => return Ok(ComposerBody::Headers(layout.full_conversation_headers_only)),
        Err(e) => failures.push(format!("{}: {e}", SchemaVersion::Headers)),
    }

    match InlineLayout::deserialize(value) {
        Ok(layout) => return Ok(ComposerBody::Inline(layout.conversation)),
        Err(e) => failures.push(format!("{}: {e}", SchemaVersion::Inline)),
    }

    let has_conversation = [HEADERS_KEY, INLINE_KEY]
        .iter()
        .any(|k| value.get(k).is_some_and(|v| !v.is_null()));
    if !has_conversation {
        return Ok(ComposerBody::Metadata);
    }

    Err(format!("no known layout matched ({})", failures.join("; ")))
}

/// Message bodies keyed by composer id, then bubble id.
#[derive(Debug, Default)]
pub struct BubbleIndex {
    bodies: HashMap<String, HashMap<String, Message>>,
}

impl BubbleIndex {
    /// Decodes `bubbleId:` records. Unreadable bodies are left out.
    #[must_use]
    pub fn build(records: &[RawRecord]) -> Self {
        let mut bodies: HashMap<String, HashMap<String, Message>> = HashMap::new();

        for record in records {
            let Some((composer_id, bubble_id)) = split_bubble_key(&record.key) else {
                continue;
            };

            match serde_json::from_slice::<RawBubble>(&record.value) {
                Ok(bubble) => {
                    bodies
                        .entry(composer_id.to_string())
                        .or_default()
                        .insert(bubble_id.to_string(), message_from_bubble(bubble));
                }
                Err(e) => {
                    tracing::debug!("Failed to parse bubble {}: {}", record.key, e);
                }
            }
        }

        Self { bodies }
    }

    fn get(&self, composer_id: &str, bubble_id: &str) -> Option<&Message> {
        self.bodies.get(composer_id)?.get(bubble_id)
    }

    /// Number of indexed bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.values().map(HashMap::len).sum()
    }
}

/// Builds a conversation from a decoded composer.
///
/// Returns the conversation and the number of messages whose body was not
/// found in `bubbles`.
///
/// # Errors
/// Returns `RecordDecode` if no timestamp can be recovered.
pub fn normalize_composer(
    decoded: DecodedComposer,
    bubbles: &BubbleIndex,
) -> Result<(Conversation, usize)> {
    let DecodedComposer { key, meta, body } = decoded;
    let schema = body.schema();

    // Checkpoints live under distinct keys but share the blob's composerId
    let key_id = extract_composer_id(&key).filter(|id| !id.is_empty());
    let id = meta
        .composer_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| key_id.map(str::to_string))
        .unwrap_or_default();

    let mut missing = 0;
    let messages: Vec<Message> = match body {
        ComposerBody::Headers(headers) => headers
            .into_iter()
            .map(|header| {
                let found = bubbles
                    .get(&id, &header.bubble_id)
                    .or_else(|| key_id.and_then(|k| bubbles.get(k, &header.bubble_id)));
                found.cloned().unwrap_or_else(|| {
                    missing += 1;
                    Message {
                        role: header.role,
                        content: String::new(),
                        timestamp: None,
                    }
                })
            })
            .collect(),
        ComposerBody::Inline(inline) => inline.into_iter().map(message_from_bubble).collect(),
        ComposerBody::Metadata => Vec::new(),
    };

    let first_message_time = messages.iter().filter_map(|m| m.timestamp).min();
    let last_message_time = messages.iter().filter_map(|m| m.timestamp).max();

    let created_at = meta
        .created_at
        .0
        .or(meta.last_updated_at.0)
        .or(first_message_time)
        .ok_or_else(|| AppError::record_decode(&key, "no usable timestamp"))?;

    let updated_at = [meta.last_updated_at.0, last_message_time]
        .into_iter()
        .flatten()
        .fold(created_at, std::cmp::max);

    let title = meta
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| derive_title(&messages))
        .unwrap_or_else(|| UNTITLED.to_string());

    let workspace = meta.code_block_data.as_ref().and_then(workspace_from_code_blocks);

    let model = meta
        .model_config
        .map(|m| m.model_name)
        .filter(|name| !name.trim().is_empty());

    let status = meta.status.filter(|s| !s.trim().is_empty());

    Ok((
        Conversation {
            id,
            title,
            messages,
            created_at,
            updated_at,
            workspace,
            model,
            status,
            schema,
        },
        missing,
    ))
}

/// Outcome of normalizing a batch of composer records.
#[derive(Debug, Default)]
pub struct Normalized {
    pub conversations: Vec<Conversation>,
    pub decode_errors: usize,
    pub missing_bodies: usize,
}

/// Decodes and normalizes every composer record, skipping broken ones.
#[must_use]
pub fn normalize_records(composers: &[RawRecord], bubbles: &BubbleIndex) -> Normalized {
    let mut out = Normalized::default();

    for record in composers {
        let result = decode_composer(record).and_then(|decoded| {
            tracing::trace!(key = %record.key, schema = %decoded.schema(), "Decoded composer");
            normalize_composer(decoded, bubbles)
        });

        match result {
            Ok((conversation, missing)) => {
                out.missing_bodies += missing;
                out.conversations.push(conversation);
            }
            Err(e) => {
                tracing::warn!("Skipping record: {}", e);
                out.decode_errors += 1;
            }
        }
    }

    out
}

fn message_from_bubble(bubble: RawBubble) -> Message {
    let mut content = bubble
        .text
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            bubble
                .rich_text
                .as_deref()
                .map(extract_rich_text)
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_default();

    for block in &bubble.code_blocks {
        let code = block.content.trim_end();
        if code.trim().is_empty() || content.contains(code) {
            continue;
        }
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        let lang = block.language_id.as_deref().unwrap_or_default();
        content.push_str(&format!("```{lang}\n{code}\n```"));
    }

    let timestamp = bubble
        .created_at
        .0
        .or_else(|| bubble.timing_info.and_then(|t| t.client_start_time.0));

    Message {
        role: bubble.role,
        content,
        timestamp,
    }
}

/// Extracts plain text from a Lexical rich-text document.
fn extract_rich_text(raw: &str) -> String {
    fn collect<'a>(node: &'a Value, out: &mut Vec<&'a str>) {
        if node.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push(text);
            }
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            for child in children {
                collect(child, out);
            }
        }
    }

    let Ok(doc) = serde_json::from_str::<Value>(raw) else {
        return String::new();
    };
    let Some(root) = doc.get("root") else {
        return String::new();
    };

    let mut texts = Vec::new();
    collect(root, &mut texts);
    texts.join(" ").trim().to_string()
}

/// Title from the first line of the first user message.
fn derive_title(messages: &[Message]) -> Option<String> {
    let first = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .find_map(|m| m.content.lines().map(str::trim).find(|l| !l.is_empty()))?;

    if first.chars().count() <= MAX_TITLE_CHARS {
        return Some(first.to_string());
    }

    let cut: String = first.chars().take(MAX_TITLE_CHARS - 3).collect();
    Some(format!("{}...", cut.trim_end()))
}

/// Recovers the project directory from `codeBlockData` file URIs.
fn workspace_from_code_blocks(data: &Map<String, Value>) -> Option<String> {
    let uri = data.keys().find(|k| k.starts_with("file:///"))?;
    let path = uri.trim_start_matches("file://");
    let parts: Vec<&str> = path.split('/').collect();

    if let Some(i) = parts.iter().position(|p| *p == "workspace") {
        if i + 2 < parts.len() {
            return Some(parts[..i + 3].join("/"));
        }
    }

    (parts.len() > 4).then(|| parts[..5].join("/"))
}

/// Parses the timestamp encodings seen across record vintages.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(from_epoch)
            .or_else(|| n.as_f64().and_then(from_epoch_float)),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(n) = s.parse::<i64>() {
        return from_epoch(n);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Zone-less ISO strings are UTC, like the epoch values
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
        .or_else(|| s.parse::<f64>().ok().and_then(from_epoch_float))
}

fn from_epoch(n: i64) -> Option<DateTime<Utc>> {
    if n <= 0 {
        return None;
    }
    if n < SECONDS_CUTOFF {
        DateTime::from_timestamp(n, 0)
    } else {
        DateTime::from_timestamp_millis(n)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn from_epoch_float(f: f64) -> Option<DateTime<Utc>> {
    if !f.is_finite() || f <= 0.0 {
        return None;
    }
    let millis = if f < SECONDS_CUTOFF as f64 { f * 1000.0 } else { f };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Extracts composer ID from a composer key.
///
/// Key format: `composerData:{composer_id}`
fn extract_composer_id(key: &str) -> Option<&str> {
    key.strip_prefix(COMPOSER_PREFIX)
}

/// Splits a bubble key into composer and bubble ids.
///
/// Key format: `bubbleId:{composer_id}:{bubble_id}`
fn split_bubble_key(key: &str) -> Option<(&str, &str)> {
    key.strip_prefix(BUBBLE_PREFIX)?.split_once(':')
}
