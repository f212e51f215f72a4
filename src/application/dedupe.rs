//! Collapsing checkpoints of the same conversation.
//!
//! Cursor saves in-progress sessions incrementally, so one logical
//! conversation can appear several times. Variants are grouped by id (or, for
//! records without one, by title and creation time) and the most complete
//! variant of each group survives.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::{Conversation, DedupePolicy};

/// Collapses duplicate conversations.
///
/// The result does not depend on input order and is sorted by
/// `(created_at, id)`.
#[must_use]
pub fn dedupe(conversations: Vec<Conversation>, policy: &DedupePolicy) -> Vec<Conversation> {
    let before = conversations.len();
    let mut by_id: BTreeMap<String, Vec<Conversation>> = BTreeMap::new();
    let mut anonymous = Vec::new();

    for conversation in conversations {
        if conversation.id.is_empty() {
            anonymous.push(conversation);
        } else {
            by_id
                .entry(conversation.id.clone())
                .or_default()
                .push(conversation);
        }
    }

    let mut groups: Vec<Vec<Conversation>> = by_id.into_values().collect();
    groups.extend(group_anonymous(anonymous, policy));

    let mut kept: Vec<Conversation> = groups
        .into_iter()
        .filter_map(|group| group.into_iter().max_by(preference))
        .collect();

    kept.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| preference(a, b))
    });

    if kept.len() < before {
        tracing::debug!("Collapsed {} duplicate conversation(s)", before - kept.len());
    }

    kept
}

/// Groups id-less conversations sharing a normalized title whose creation
/// times chain together within the policy window.
fn group_anonymous(
    mut conversations: Vec<Conversation>,
    policy: &DedupePolicy,
) -> Vec<Vec<Conversation>> {
    let Some(window) = policy.title_window else {
        return conversations.into_iter().map(|c| vec![c]).collect();
    };

    conversations.sort_by(|a, b| {
        normalize_title(&a.title)
            .cmp(&normalize_title(&b.title))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| preference(a, b))
    });

    let mut groups: Vec<Vec<Conversation>> = Vec::new();
    for conversation in conversations {
        let joins_last = groups
            .last()
            .and_then(|group| group.last())
            .is_some_and(|prev| {
                normalize_title(&prev.title) == normalize_title(&conversation.title)
                    && conversation.created_at - prev.created_at <= window
            });

        match groups.last_mut() {
            Some(group) if joins_last => group.push(conversation),
            _ => groups.push(vec![conversation]),
        }
    }

    groups
}

/// Orders variants so the preferred one is greatest: most messages, then
/// latest update, then id, then content.
fn preference(a: &Conversation, b: &Conversation) -> Ordering {
    a.messages
        .len()
        .cmp(&b.messages.len())
        .then_with(|| a.updated_at.cmp(&b.updated_at))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.messages.cmp(&b.messages))
        .then_with(|| a.workspace.cmp(&b.workspace))
        .then_with(|| a.model.cmp(&b.model))
        .then_with(|| a.status.cmp(&b.status))
        .then_with(|| a.schema.cmp(&b.schema))
}

fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, Role, SchemaVersion};
    use chrono::{DateTime, TimeDelta, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn conv(id: &str, title: &str, created: i64, updated: i64, messages: usize) -> Conversation {
        Conversation {
            id: id.into(),
            title: title.into(),
            messages: (0..messages)
                .map(|i| Message {
                    role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                    content: format!("message {i}"),
                    timestamp: None,
                })
                .collect(),
            created_at: at(created),
            updated_at: at(updated),
            workspace: None,
            model: None,
            status: None,
            schema: SchemaVersion::Headers,
        }
    }

    fn policy(secs: i64) -> DedupePolicy {
        DedupePolicy {
            title_window: TimeDelta::try_seconds(secs),
        }
    }

    fn sample() -> Vec<Conversation> {
        vec![
            conv("a", "Fix build", 0, 100, 3),
            conv("a", "Fix build", 0, 900, 7),
            conv("b", "Docs", 50, 60, 2),
            conv("b", "Docs", 50, 80, 2),
            conv("", "Quick question", 200, 210, 1),
            conv("", "quick  QUESTION", 230, 400, 4),
            conv("", "Quick question", 5000, 5000, 1),
            conv("", "Other", 205, 205, 1),
        ]
    }

    #[test]
    fn test_keeps_most_complete_variant() {
        let out = dedupe(
            vec![conv("a", "t", 0, 900, 7), conv("a", "t", 0, 100, 3)],
            &policy(60),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].messages.len(), 7);
    }

    #[test]
    fn test_tie_breaks_on_latest_update() {
        let out = dedupe(sample(), &policy(60));
        let docs = out.iter().find(|c| c.id == "b").unwrap();
        assert_eq!(docs.updated_at, at(80));
    }

    #[test]
    fn test_anonymous_titles_match_within_window() {
        let out = dedupe(sample(), &policy(60));

        let quick: Vec<&Conversation> = out
            .iter()
            .filter(|c| c.title.to_lowercase().starts_with("quick"))
            .collect();
        assert_eq!(quick.len(), 2);
        assert_eq!(quick[0].messages.len(), 4);
        assert_eq!(quick[1].created_at, at(5000));
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_disabled_window_keeps_anonymous_records() {
        let out = dedupe(sample(), &DedupePolicy { title_window: None });
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn test_order_independent() {
        let expected = dedupe(sample(), &policy(60));

        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(dedupe(reversed, &policy(60)), expected);

        for shift in 1..sample().len() {
            let mut rotated = sample();
            rotated.rotate_left(shift);
            assert_eq!(dedupe(rotated, &policy(60)), expected, "rotation {shift}");
        }
    }

    #[test]
    fn test_idempotent() {
        let once = dedupe(sample(), &policy(60));
        let twice = dedupe(once.clone(), &policy(60));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_chained_checkpoints_stay_separate_after_collapse() {
        // 0 -> 50 -> 100 chain into one group; 161 is more than 60s after 100
        let input = vec![
            conv("", "t", 0, 0, 1),
            conv("", "t", 50, 50, 1),
            conv("", "t", 100, 100, 5),
            conv("", "t", 161, 161, 2),
        ];
        let once = dedupe(input, &policy(60));
        assert_eq!(once.len(), 2);
        assert_eq!(dedupe(once.clone(), &policy(60)), once);
    }

    #[test]
    fn test_output_sorted_by_creation() {
        let out = dedupe(sample(), &policy(60));
        assert!(out.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
