//! Calendar-day filtering.
//!
//! A conversation belongs to a day when it was created or last updated
//! during that day, so sessions running across midnight show up on both days.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::domain::Conversation;

/// Half-open `[start, end)` interval covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window for `date` as observed in `tz`.
    #[must_use]
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self {
            start: local_midnight(date, tz),
            end: local_midnight(next, tz),
        }
    }

    /// Whether `instant` lies inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether the conversation was active during the window.
    #[must_use]
    pub fn overlaps(&self, conversation: &Conversation) -> bool {
        self.contains(conversation.created_at) || self.contains(conversation.updated_at)
    }
}

/// First instant of `date` in `tz`. A midnight skipped by a DST jump resolves
/// to the first valid instant after it.
fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);

    if let Some(dt) = tz.from_local_datetime(&midnight).earliest() {
        return dt.with_timezone(&Utc);
    }

    (1..=24)
        .filter_map(|step| {
            let shifted = midnight + chrono::TimeDelta::try_minutes(step * 15)?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .next()
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// Keeps the conversations active during `window`.
#[must_use]
pub fn filter_by_day(conversations: Vec<Conversation>, window: &DayWindow) -> Vec<Conversation> {
    let before = conversations.len();
    let kept: Vec<Conversation> = conversations
        .into_iter()
        .filter(|c| window.overlaps(c))
        .collect();

    tracing::debug!(
        "Date filter kept {} of {} conversations ({} .. {})",
        kept.len(),
        before,
        window.start,
        window.end
    );

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SchemaVersion, UNTITLED};
    use chrono::FixedOffset;

    fn conv(id: &str, created: DateTime<Utc>, updated: DateTime<Utc>) -> Conversation {
        Conversation {
            id: id.into(),
            title: UNTITLED.into(),
            messages: Vec::new(),
            created_at: created,
            updated_at: updated,
            workspace: None,
            model: None,
            status: None,
            schema: SchemaVersion::Metadata,
        }
    }

    fn local(tz: &FixedOffset, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        tz.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_uses_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let window = DayWindow::for_date(day(2025, 3, 10), &tz);

        assert_eq!(window.start.to_rfc3339(), "2025-03-09T22:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2025-03-10T22:00:00+00:00");
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_session_across_midnight_is_on_both_days() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let c = conv(
            "late",
            local(&tz, 2025, 3, 9, 23, 50),
            local(&tz, 2025, 3, 10, 0, 10),
        );

        let previous = DayWindow::for_date(day(2025, 3, 9), &tz);
        let today = DayWindow::for_date(day(2025, 3, 10), &tz);
        let tomorrow = DayWindow::for_date(day(2025, 3, 11), &tz);

        assert_eq!(filter_by_day(vec![c.clone()], &previous).len(), 1);
        assert_eq!(filter_by_day(vec![c.clone()], &today).len(), 1);
        assert!(filter_by_day(vec![c], &tomorrow).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let window = DayWindow::for_date(day(2025, 1, 1), &tz);
        let input = vec![
            conv("a", local(&tz, 2025, 1, 1, 9, 0), local(&tz, 2025, 1, 1, 10, 0)),
            conv("b", local(&tz, 2024, 12, 31, 9, 0), local(&tz, 2024, 12, 31, 10, 0)),
            conv("c", local(&tz, 2024, 12, 1, 9, 0), local(&tz, 2025, 1, 1, 0, 0)),
            conv("d", local(&tz, 2025, 1, 2, 0, 0), local(&tz, 2025, 1, 2, 1, 0)),
        ];

        let once = filter_by_day(input, &window);
        let twice = filter_by_day(once.clone(), &window);

        assert_eq!(once, twice);
        let ids: Vec<&str> = once.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
