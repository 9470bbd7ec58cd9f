use crate::error::CoreError;
use crate::models::{
    Channel, NotificationPreferences, ReminderKind, ReminderNotification, TaskOccurrence,
};
use crate::reminders::{compute_reminder_instants, Delivery, DispatchSummary, ReminderPayload};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Join row carrying what the transport needs to render a due reminder.
#[derive(Debug, FromRow)]
struct DueReminder {
    id: Uuid,
    occurrence_id: Uuid,
    member_id: Uuid,
    channel: Channel,
    kind: ReminderKind,
    title: String,
    due_at: DateTime<Utc>,
}

#[async_trait]
impl super::ReminderRepository for SqliteRepository {
    async fn schedule_for_occurrence(
        &self,
        occurrence_id: Uuid,
        preferences: &NotificationPreferences,
    ) -> Result<Vec<ReminderNotification>, CoreError> {
        // Read and insert on the same connection so a just-committed
        // assignment is always visible to this call.
        let mut tx = self.pool().begin().await?;

        let occurrence: Option<TaskOccurrence> =
            sqlx::query_as("SELECT * FROM task_occurrences WHERE id = $1")
                .bind(occurrence_id)
                .fetch_optional(&mut *tx)
                .await?;
        let occurrence = occurrence.ok_or_else(|| {
            CoreError::NotFound(format!("Occurrence {occurrence_id} not found"))
        })?;

        // No reminders for unassigned work.
        let Some(recipient) = occurrence.assigned_to else {
            tx.commit().await?;
            return Ok(Vec::new());
        };

        let instants = compute_reminder_instants(occurrence.due_at, preferences, Utc::now());

        let mut created = Vec::with_capacity(instants.len());
        for (scheduled_for, kind) in instants {
            // The unique (occurrence, recipient, scheduled_for) tuple makes
            // re-scheduling a no-op; only freshly created rows are returned.
            let row: Option<ReminderNotification> = sqlx::query_as(
                r#"INSERT INTO reminder_notifications
                    (id, occurrence_id, member_id, channel, kind, scheduled_for,
                     sent_at, delivered, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, NULL, 0, $7)
                ON CONFLICT (occurrence_id, member_id, scheduled_for) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(occurrence_id)
            .bind(recipient)
            .bind(preferences.channel)
            .bind(kind)
            .bind(scheduled_for)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(row) = row {
                created.push(row);
            }
        }

        tx.commit().await?;

        tracing::debug!(
            occurrence_id = %occurrence_id,
            count = created.len(),
            "scheduled reminders"
        );
        Ok(created)
    }

    async fn dispatch_due(
        &self,
        now: DateTime<Utc>,
        delivery: &dyn Delivery,
        limit: usize,
    ) -> Result<DispatchSummary, CoreError> {
        let due: Vec<DueReminder> = sqlx::query_as(
            r#"SELECT r.id, r.occurrence_id, r.member_id, r.channel, r.kind,
                      td.title, o.due_at
            FROM reminder_notifications r
            JOIN task_occurrences o ON r.occurrence_id = o.id
            JOIN task_definitions td ON o.task_id = td.id
            WHERE r.sent_at IS NULL AND r.scheduled_for <= $1
            ORDER BY r.scheduled_for
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        let mut summary = DispatchSummary::default();
        for reminder in due {
            // Claim the slot before attempting it; a competing dispatcher
            // loses this race and skips the row, so each slot gets exactly
            // one attempt.
            let claimed = sqlx::query(
                "UPDATE reminder_notifications SET sent_at = $1 WHERE id = $2 AND sent_at IS NULL",
            )
            .bind(now)
            .bind(reminder.id)
            .execute(self.pool())
            .await?;
            if claimed.rows_affected() == 0 {
                continue;
            }

            let payload = ReminderPayload {
                occurrence_id: reminder.occurrence_id,
                title: reminder.title,
                due_at: reminder.due_at,
            };
            let delivered = delivery
                .send(reminder.member_id, reminder.channel, reminder.kind, &payload)
                .await;

            sqlx::query("UPDATE reminder_notifications SET delivered = $1 WHERE id = $2")
                .bind(delivered)
                .bind(reminder.id)
                .execute(self.pool())
                .await?;

            summary.processed += 1;
            if delivered {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    async fn find_reminders_for_occurrence(
        &self,
        occurrence_id: Uuid,
    ) -> Result<Vec<ReminderNotification>, CoreError> {
        let reminders = sqlx::query_as(
            "SELECT * FROM reminder_notifications WHERE occurrence_id = $1 ORDER BY scheduled_for",
        )
        .bind(occurrence_id)
        .fetch_all(self.pool())
        .await?;
        Ok(reminders)
    }
}
