use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::state::OccurrenceState;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A recurring chore template. Either household-scoped or a global catalog
/// template, never both or neither (CHECK-enforced in the schema, validated
/// again on insert).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskDefinition {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub rrule: String,
    pub estimated_minutes: Option<i64>,
    pub room_id: Option<Uuid>,
    pub household_id: Option<Uuid>,
    pub is_catalog: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Wire/storage status of an occurrence. Exactly these five strings, stable
/// across versions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceStatus {
    Pending,
    Snoozed,
    Done,
    Skipped,
    Overdue,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid occurrence status: {0}")]
pub struct ParseOccurrenceStatusError(String);

impl FromStr for OccurrenceStatus {
    type Err = ParseOccurrenceStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OccurrenceStatus::Pending),
            "snoozed" => Ok(OccurrenceStatus::Snoozed),
            "done" => Ok(OccurrenceStatus::Done),
            "skipped" => Ok(OccurrenceStatus::Skipped),
            "overdue" => Ok(OccurrenceStatus::Overdue),
            _ => Err(ParseOccurrenceStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccurrenceStatus::Pending => write!(f, "pending"),
            OccurrenceStatus::Snoozed => write!(f, "snoozed"),
            OccurrenceStatus::Done => write!(f, "done"),
            OccurrenceStatus::Skipped => write!(f, "skipped"),
            OccurrenceStatus::Overdue => write!(f, "overdue"),
        }
    }
}

/// One concrete, dated instance of a recurring definition.
///
/// `state` collapses the `status` / `snoozed_until` column pair into a sum
/// type; see [`OccurrenceState`].
#[derive(Debug, Clone)]
pub struct TaskOccurrence {
    pub id: Uuid,
    pub task_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub due_at: DateTime<Utc>,
    pub state: OccurrenceState,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TaskOccurrence {
    pub fn status(&self) -> OccurrenceStatus {
        self.state.status()
    }
}

impl<'r> FromRow<'r, SqliteRow> for TaskOccurrence {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let snoozed_until: Option<DateTime<Utc>> = row.try_get("snoozed_until")?;
        let state = OccurrenceState::from_parts(&status, snoozed_until).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            scheduled_date: row.try_get("scheduled_date")?,
            due_at: row.try_get("due_at")?,
            state,
            assigned_to: row.try_get("assigned_to")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Immutable completion record, created exactly once when an occurrence
/// transitions to done. Never deleted, not even by `reopen`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskCompletion {
    pub id: Uuid,
    pub occurrence_id: Uuid,
    pub completed_by: Uuid,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
    pub comment: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Push,
    Email,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid channel: {0}")]
pub struct ParseChannelError(String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(Channel::Push),
            "email" => Ok(Channel::Email),
            _ => Err(ParseChannelError(s.to_string())),
        }
    }
}

/// Which slot a reminder belongs to, relative to the due time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum ReminderKind {
    #[sqlx(rename = "day_before")]
    #[serde(rename = "day_before")]
    DayBefore,
    #[sqlx(rename = "same_day")]
    #[serde(rename = "same_day")]
    SameDay,
    #[sqlx(rename = "2h_before")]
    #[serde(rename = "2h_before")]
    TwoHoursBefore,
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderKind::DayBefore => write!(f, "day_before"),
            ReminderKind::SameDay => write!(f, "same_day"),
            ReminderKind::TwoHoursBefore => write!(f, "2h_before"),
        }
    }
}

/// A scheduled delivery unit. `sent_at` stays null until a dispatch cycle
/// attempts it; `delivered` records the transport outcome truthfully.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReminderNotification {
    pub id: Uuid,
    pub occurrence_id: Uuid,
    pub member_id: Uuid,
    pub channel: Channel,
    pub kind: ReminderKind,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}

/// Daily window during which reminders are deferred or dropped. Hours are
/// 0-23; the window may wrap midnight (e.g. 22 -> 8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuietHours {
    pub start_hour: u8,
    pub end_hour: u8,
}

/// A recipient's reminder preferences, consumed from the external
/// preferences collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub reminder_day_before: bool,
    pub reminder_same_day: bool,
    pub reminder_2h_before: bool,
    pub channel: Channel,
    pub quiet_hours: Option<QuietHours>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            reminder_day_before: true,
            reminder_same_day: true,
            reminder_2h_before: true,
            channel: Channel::Push,
            quiet_hours: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewDefinitionData {
    pub title: String,
    pub description: Option<String>,
    pub rrule: String,
    pub estimated_minutes: Option<i64>,
    pub room_id: Option<Uuid>,
    /// None only for catalog templates
    pub household_id: Option<Uuid>,
    pub is_catalog: bool,
    pub created_by: Option<Uuid>,
}

/// Partial update; the outer `Option` means "change this field", the inner
/// one carries the new value (`None` clears it).
#[derive(Debug, Clone, Default)]
pub struct UpdateDefinitionData {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub rrule: Option<String>,
    pub estimated_minutes: Option<Option<i64>>,
    pub room_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionInput {
    pub completed_by: Uuid,
    pub duration_minutes: Option<i64>,
    pub comment: Option<String>,
    pub photo_url: Option<String>,
}

/// Filter for listing occurrences. Every field is optional and independently
/// composable; set fields combine with AND, unset fields mean "no constraint".
#[derive(Debug, Clone, Default)]
pub struct OccurrenceFilter {
    pub household_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<OccurrenceStatus>,
    pub assigned_to: Option<Uuid>,
    pub room_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_values_roundtrip() {
        for (raw, status) in [
            ("pending", OccurrenceStatus::Pending),
            ("snoozed", OccurrenceStatus::Snoozed),
            ("done", OccurrenceStatus::Done),
            ("skipped", OccurrenceStatus::Skipped),
            ("overdue", OccurrenceStatus::Overdue),
        ] {
            assert_eq!(raw.parse::<OccurrenceStatus>().unwrap(), status);
            assert_eq!(status.to_string(), raw);
        }
        assert!("cancelled".parse::<OccurrenceStatus>().is_err());
    }

    #[test]
    fn test_reminder_kind_display() {
        assert_eq!(ReminderKind::DayBefore.to_string(), "day_before");
        assert_eq!(ReminderKind::SameDay.to_string(), "same_day");
        assert_eq!(ReminderKind::TwoHoursBefore.to_string(), "2h_before");
    }

    #[test]
    fn test_default_preferences_enable_all_reminders() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.reminder_day_before);
        assert!(prefs.reminder_same_day);
        assert!(prefs.reminder_2h_before);
        assert_eq!(prefs.channel, Channel::Push);
        assert!(prefs.quiet_hours.is_none());
    }
}
