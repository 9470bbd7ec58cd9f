use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Channel, NotificationPreferences, QuietHours, ReminderKind};

/// Computes the reminder instants for a due time, honoring the recipient's
/// preference flags and quiet hours.
///
/// Kinds: `day_before` is due minus 24h, `same_day` is 09:00 UTC on the due
/// date (only when that still precedes the due time), `2h_before` is due
/// minus 2h. An instant falling inside quiet hours is pushed to the window's
/// end, or dropped if the push would land past the due time. Instants not
/// strictly after `now` are dropped; reminders are never scheduled into the
/// past. The result is ordered chronologically.
pub fn compute_reminder_instants(
    due_at: DateTime<Utc>,
    preferences: &NotificationPreferences,
    now: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, ReminderKind)> {
    let mut raw = Vec::with_capacity(3);

    if preferences.reminder_day_before {
        raw.push((due_at - Duration::days(1), ReminderKind::DayBefore));
    }
    if preferences.reminder_same_day {
        let morning = due_at.date_naive().and_time(nine_am()).and_utc();
        if morning < due_at {
            raw.push((morning, ReminderKind::SameDay));
        }
    }
    if preferences.reminder_2h_before {
        raw.push((due_at - Duration::hours(2), ReminderKind::TwoHoursBefore));
    }

    let mut instants: Vec<(DateTime<Utc>, ReminderKind)> = raw
        .into_iter()
        .filter_map(|(instant, kind)| {
            let instant = match preferences.quiet_hours {
                Some(window) => shift_out_of_quiet_hours(instant, window, due_at)?,
                None => instant,
            };
            (instant > now).then_some((instant, kind))
        })
        .collect();

    instants.sort_by_key(|(instant, _)| *instant);
    instants
}

/// Pushes an instant inside the quiet window to the window's end. Returns
/// `None` when the pushed instant would land past the due time.
fn shift_out_of_quiet_hours(
    instant: DateTime<Utc>,
    window: QuietHours,
    due_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let hour = instant.hour() as u8;
    let start = window.start_hour;
    let end = window.end_hour;

    // A degenerate window covers nothing.
    if start == end {
        return Some(instant);
    }

    let in_window = if start < end {
        hour >= start && hour < end
    } else {
        // Window wraps midnight (e.g. 22 -> 6).
        hour >= start || hour < end
    };
    if !in_window {
        return Some(instant);
    }

    let end_time = NaiveTime::from_hms_opt(end as u32, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut shifted = instant.date_naive().and_time(end_time).and_utc();
    if start > end && hour >= start {
        // Caught in the pre-midnight half; the window ends tomorrow.
        shifted += Duration::days(1);
    }

    (shifted <= due_at).then_some(shifted)
}

fn nine_am() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// What a delivery transport needs to render a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub occurrence_id: Uuid,
    pub title: String,
    pub due_at: DateTime<Utc>,
}

/// Outbound transport boundary. Implementations return `true` on successful
/// delivery; the core records the outcome and never retries internally.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(
        &self,
        recipient: Uuid,
        channel: Channel,
        kind: ReminderKind,
        payload: &ReminderPayload,
    ) -> bool;
}

/// Bookkeeping for one dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_all_three_kinds_in_order() {
        // Due tomorrow 18:00; all flags on, no quiet hours.
        let now = utc(2024, 6, 10, 8, 0);
        let due = utc(2024, 6, 11, 18, 0);
        let instants = compute_reminder_instants(due, &NotificationPreferences::default(), now);

        assert_eq!(
            instants,
            vec![
                (utc(2024, 6, 10, 18, 0), ReminderKind::DayBefore),
                (utc(2024, 6, 11, 9, 0), ReminderKind::SameDay),
                (utc(2024, 6, 11, 16, 0), ReminderKind::TwoHoursBefore),
            ]
        );
    }

    #[test]
    fn test_disabled_flags_suppress_kinds() {
        let now = utc(2024, 6, 10, 8, 0);
        let due = utc(2024, 6, 11, 18, 0);
        let prefs = NotificationPreferences {
            reminder_day_before: false,
            reminder_2h_before: false,
            ..Default::default()
        };
        let instants = compute_reminder_instants(due, &prefs, now);
        assert_eq!(instants, vec![(utc(2024, 6, 11, 9, 0), ReminderKind::SameDay)]);
    }

    #[test]
    fn test_same_day_dropped_when_due_before_morning() {
        let now = utc(2024, 6, 10, 1, 0);
        let due = utc(2024, 6, 11, 8, 0);
        let instants = compute_reminder_instants(due, &NotificationPreferences::default(), now);
        assert!(instants
            .iter()
            .all(|(_, kind)| *kind != ReminderKind::SameDay));
    }

    #[test]
    fn test_past_instants_dropped() {
        // Due in one hour: every computed instant is already behind us.
        let now = utc(2024, 6, 11, 17, 0);
        let due = utc(2024, 6, 11, 18, 0);
        let instants = compute_reminder_instants(due, &NotificationPreferences::default(), now);
        assert!(instants.is_empty());
    }

    #[test]
    fn test_quiet_hours_shift_to_window_end() {
        // day_before lands at 12:00, inside 9-13; pushed to 13:00 same day.
        let now = utc(2024, 6, 9, 1, 0);
        let due = utc(2024, 6, 11, 12, 0);
        let prefs = NotificationPreferences {
            reminder_same_day: false,
            reminder_2h_before: false,
            quiet_hours: Some(QuietHours {
                start_hour: 9,
                end_hour: 13,
            }),
            ..Default::default()
        };
        let instants = compute_reminder_instants(due, &prefs, now);
        assert_eq!(
            instants,
            vec![(utc(2024, 6, 10, 13, 0), ReminderKind::DayBefore)]
        );
    }

    #[test]
    fn test_quiet_hours_drop_past_due() {
        // 2h_before lands at 10:00, inside 9-13; pushing to 13:00 would
        // overshoot the 12:00 due time, so the reminder is dropped.
        let now = utc(2024, 6, 11, 1, 0);
        let due = utc(2024, 6, 11, 12, 0);
        let prefs = NotificationPreferences {
            reminder_day_before: false,
            reminder_same_day: false,
            quiet_hours: Some(QuietHours {
                start_hour: 9,
                end_hour: 13,
            }),
            ..Default::default()
        };
        assert!(compute_reminder_instants(due, &prefs, now).is_empty());
    }

    #[test]
    fn test_quiet_hours_wrapping_midnight() {
        // Window 22 -> 6. An instant at 23:00 rolls to 06:00 the next day.
        let now = utc(2024, 6, 9, 1, 0);
        let due = utc(2024, 6, 11, 23, 0);
        let prefs = NotificationPreferences {
            reminder_same_day: false,
            reminder_2h_before: false,
            quiet_hours: Some(QuietHours {
                start_hour: 22,
                end_hour: 6,
            }),
            ..Default::default()
        };
        let instants = compute_reminder_instants(due, &prefs, now);
        assert_eq!(
            instants,
            vec![(utc(2024, 6, 11, 6, 0), ReminderKind::DayBefore)]
        );
    }

    #[test]
    fn test_degenerate_quiet_window_is_ignored() {
        let now = utc(2024, 6, 10, 8, 0);
        let due = utc(2024, 6, 11, 18, 0);
        let prefs = NotificationPreferences {
            quiet_hours: Some(QuietHours {
                start_hour: 9,
                end_hour: 9,
            }),
            ..Default::default()
        };
        let instants = compute_reminder_instants(due, &prefs, now);
        assert_eq!(instants.len(), 3);
    }
}
