//! Occurrence lifecycle states and transition guards.
//!
//! The lifecycle is modeled as a closed sum type: `snoozed_until` exists only
//! inside the `Snoozed` variant, so "snoozed_until must be null outside
//! SNOOZED" is enforced structurally rather than validated separately. The
//! SQL transition predicates in `repository::transitions` mirror the guards
//! defined here.

use chrono::{DateTime, Utc};
use std::str::FromStr;
use thiserror::Error;

use crate::models::OccurrenceStatus;

/// The state of a task occurrence.
///
/// `Pending` and `Overdue` are interchangeable pre-completion states
/// distinguished only by whether the due time has passed. `Done` can be
/// reopened; `Skipped` is a stable storage value that no transition currently
/// produces (`skip` lands on `Overdue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceState {
    Pending,
    Snoozed { until: DateTime<Utc> },
    Done,
    Skipped,
    Overdue,
}

#[derive(Error, Debug, PartialEq)]
pub enum StateError {
    #[error("Invalid occurrence status: {0}")]
    InvalidStatus(String),

    #[error("Status is 'snoozed' but snoozed_until is missing")]
    MissingSnoozedUntil,
}

impl OccurrenceState {
    /// Reassembles a state from its storage columns.
    ///
    /// A `snoozed` row without `snoozed_until` is rejected; a stray
    /// `snoozed_until` on any other status is ignored, matching the data
    /// model rule that the field only carries meaning while snoozed.
    pub fn from_parts(
        status: &str,
        snoozed_until: Option<DateTime<Utc>>,
    ) -> Result<Self, StateError> {
        let status = OccurrenceStatus::from_str(status)
            .map_err(|e| StateError::InvalidStatus(e.to_string()))?;
        match status {
            OccurrenceStatus::Pending => Ok(OccurrenceState::Pending),
            OccurrenceStatus::Snoozed => snoozed_until
                .map(|until| OccurrenceState::Snoozed { until })
                .ok_or(StateError::MissingSnoozedUntil),
            OccurrenceStatus::Done => Ok(OccurrenceState::Done),
            OccurrenceStatus::Skipped => Ok(OccurrenceState::Skipped),
            OccurrenceStatus::Overdue => Ok(OccurrenceState::Overdue),
        }
    }

    /// The wire/storage status for this state.
    pub fn status(&self) -> OccurrenceStatus {
        match self {
            OccurrenceState::Pending => OccurrenceStatus::Pending,
            OccurrenceState::Snoozed { .. } => OccurrenceStatus::Snoozed,
            OccurrenceState::Done => OccurrenceStatus::Done,
            OccurrenceState::Skipped => OccurrenceStatus::Skipped,
            OccurrenceState::Overdue => OccurrenceStatus::Overdue,
        }
    }

    /// The `snoozed_until` storage column for this state.
    pub fn snoozed_until(&self) -> Option<DateTime<Utc>> {
        match self {
            OccurrenceState::Snoozed { until } => Some(*until),
            _ => None,
        }
    }

    /// `complete` is legal from any state except `Done`.
    pub fn can_complete(&self) -> bool {
        !matches!(self, OccurrenceState::Done)
    }

    /// `snooze` is legal from any state except `Done` and `Skipped`.
    pub fn can_snooze(&self) -> bool {
        !matches!(self, OccurrenceState::Done | OccurrenceState::Skipped)
    }

    /// `skip` shares the snooze guard.
    pub fn can_skip(&self) -> bool {
        self.can_snooze()
    }

    /// `assign` is legal from any state except `Done` and `Skipped`.
    pub fn can_assign(&self) -> bool {
        self.can_snooze()
    }

    /// `reopen` is legal only from `Done`.
    pub fn can_reopen(&self) -> bool {
        matches!(self, OccurrenceState::Done)
    }

    /// `mark_overdue` is a system-only transition, legal only from `Pending`.
    pub fn can_mark_overdue(&self) -> bool {
        matches!(self, OccurrenceState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_from_parts_roundtrip() {
        let until = Utc::now() + Duration::hours(3);
        let snoozed = OccurrenceState::from_parts("snoozed", Some(until)).unwrap();
        assert_eq!(snoozed, OccurrenceState::Snoozed { until });
        assert_eq!(snoozed.status(), OccurrenceStatus::Snoozed);
        assert_eq!(snoozed.snoozed_until(), Some(until));

        for (raw, state) in [
            ("pending", OccurrenceState::Pending),
            ("done", OccurrenceState::Done),
            ("skipped", OccurrenceState::Skipped),
            ("overdue", OccurrenceState::Overdue),
        ] {
            assert_eq!(OccurrenceState::from_parts(raw, None).unwrap(), state);
            assert_eq!(state.snoozed_until(), None);
        }
    }

    #[test]
    fn test_from_parts_snoozed_without_until() {
        let result = OccurrenceState::from_parts("snoozed", None);
        assert_eq!(result.unwrap_err(), StateError::MissingSnoozedUntil);
    }

    #[test]
    fn test_from_parts_ignores_stray_snoozed_until() {
        let until = Utc::now();
        let state = OccurrenceState::from_parts("pending", Some(until)).unwrap();
        assert_eq!(state, OccurrenceState::Pending);
        assert_eq!(state.snoozed_until(), None);
    }

    #[test]
    fn test_from_parts_invalid_status() {
        assert!(matches!(
            OccurrenceState::from_parts("archived", None),
            Err(StateError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_transition_guards() {
        let snoozed = OccurrenceState::Snoozed { until: Utc::now() };

        assert!(OccurrenceState::Pending.can_complete());
        assert!(snoozed.can_complete());
        assert!(OccurrenceState::Overdue.can_complete());
        assert!(OccurrenceState::Skipped.can_complete());
        assert!(!OccurrenceState::Done.can_complete());

        assert!(OccurrenceState::Pending.can_snooze());
        assert!(OccurrenceState::Overdue.can_snooze());
        assert!(snoozed.can_snooze());
        assert!(!OccurrenceState::Done.can_snooze());
        assert!(!OccurrenceState::Skipped.can_snooze());

        assert!(!OccurrenceState::Done.can_skip());
        assert!(!OccurrenceState::Skipped.can_assign());

        assert!(OccurrenceState::Done.can_reopen());
        assert!(!OccurrenceState::Pending.can_reopen());
        assert!(!OccurrenceState::Overdue.can_reopen());

        assert!(OccurrenceState::Pending.can_mark_overdue());
        assert!(!snoozed.can_mark_overdue());
        assert!(!OccurrenceState::Overdue.can_mark_overdue());
        assert!(!OccurrenceState::Done.can_mark_overdue());
    }
}
