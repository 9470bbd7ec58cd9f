use crate::error::CoreError;
use crate::models::{CompletionInput, TaskCompletion, TaskOccurrence};
use crate::repository::{CompletionResult, SqliteRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
impl super::TransitionRepository for SqliteRepository {
    async fn complete_occurrence(
        &self,
        id: Uuid,
        input: CompletionInput,
    ) -> Result<CompletionResult, CoreError> {
        let mut tx = self.pool().begin().await?;

        // The status predicate is re-checked inside the statement so a
        // concurrent transition cannot be clobbered.
        let updated: Option<TaskOccurrence> = sqlx::query_as(
            r#"UPDATE task_occurrences
            SET status = 'done', snoozed_until = NULL
            WHERE id = $1 AND status != 'done'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let occurrence = match updated {
            Some(occurrence) => occurrence,
            None => {
                let exists: Option<(Uuid,)> =
                    sqlx::query_as("SELECT id FROM task_occurrences WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match exists {
                    Some(_) => {
                        CoreError::Conflict(format!("Occurrence {id} is already completed"))
                    }
                    None => CoreError::NotFound(format!("Occurrence {id} not found")),
                });
            }
        };

        let completion: TaskCompletion = sqlx::query_as(
            r#"INSERT INTO task_completions
                (id, occurrence_id, completed_by, completed_at, duration_minutes, comment, photo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(id)
        .bind(input.completed_by)
        .bind(Utc::now())
        .bind(input.duration_minutes)
        .bind(input.comment)
        .bind(input.photo_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CompletionResult {
            occurrence,
            completion,
        })
    }

    async fn snooze_occurrence(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<TaskOccurrence, CoreError> {
        if until <= Utc::now() {
            return Err(CoreError::InvalidInput(
                "Snooze time must be in the future".to_string(),
            ));
        }

        let updated: Option<TaskOccurrence> = sqlx::query_as(
            r#"UPDATE task_occurrences
            SET status = 'snoozed', snoozed_until = $2
            WHERE id = $1 AND status NOT IN ('done', 'skipped')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(until)
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(occurrence) => Ok(occurrence),
            None => Err(self.refusal_for(id, "snoozed").await?),
        }
    }

    async fn skip_occurrence(&self, id: Uuid) -> Result<TaskOccurrence, CoreError> {
        // An intentionally skipped task stays owed: it lands in 'overdue',
        // not a terminal state.
        let updated: Option<TaskOccurrence> = sqlx::query_as(
            r#"UPDATE task_occurrences
            SET status = 'overdue', snoozed_until = NULL
            WHERE id = $1 AND status NOT IN ('done', 'skipped')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(occurrence) => Ok(occurrence),
            None => Err(self.refusal_for(id, "skipped").await?),
        }
    }

    async fn assign_occurrence(
        &self,
        id: Uuid,
        assignee: Uuid,
    ) -> Result<TaskOccurrence, CoreError> {
        // The membership check and the guarded update share one connection
        // so a freshly committed occurrence or member is always visible.
        let mut tx = self.pool().begin().await?;

        let occurrence: Option<TaskOccurrence> =
            sqlx::query_as("SELECT * FROM task_occurrences WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let occurrence =
            occurrence.ok_or_else(|| CoreError::NotFound(format!("Occurrence {id} not found")))?;

        let household_id: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT household_id FROM task_definitions WHERE id = $1")
                .bind(occurrence.task_id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some((Some(household_id),)) = household_id {
            let member: (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM household_members WHERE household_id = $1 AND user_id = $2",
            )
            .bind(household_id)
            .bind(assignee)
            .fetch_one(&mut *tx)
            .await?;
            if member.0 == 0 {
                return Err(CoreError::InvalidInput(format!(
                    "User {assignee} is not a member of household {household_id}"
                )));
            }
        }

        let updated: Option<TaskOccurrence> = sqlx::query_as(
            r#"UPDATE task_occurrences
            SET assigned_to = $2
            WHERE id = $1 AND status NOT IN ('done', 'skipped')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(assignee)
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(occurrence) => {
                tx.commit().await?;
                Ok(occurrence)
            }
            // The row was just read inside this transaction, so a missed
            // update can only mean the status guard refused it.
            None => Err(CoreError::Conflict(format!(
                "Occurrence {id} cannot be assigned in its current state"
            ))),
        }
    }

    async fn reopen_occurrence(&self, id: Uuid) -> Result<TaskOccurrence, CoreError> {
        // The historical completion row stays; completions are never deleted.
        let updated: Option<TaskOccurrence> = sqlx::query_as(
            r#"UPDATE task_occurrences
            SET status = 'pending', snoozed_until = NULL
            WHERE id = $1 AND status = 'done'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(occurrence) => Ok(occurrence),
            None => Err(self.refusal_for(id, "reopened").await?),
        }
    }

    async fn sweep_overdue(
        &self,
        household_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<u64, CoreError> {
        let result = match household_id {
            Some(household_id) => {
                sqlx::query(
                    r#"UPDATE task_occurrences
                    SET status = 'overdue', snoozed_until = NULL
                    WHERE status = 'pending' AND due_at < $1
                      AND task_id IN (SELECT id FROM task_definitions WHERE household_id = $2)
                    "#,
                )
                .bind(now)
                .bind(household_id)
                .execute(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"UPDATE task_occurrences
                    SET status = 'overdue', snoozed_until = NULL
                    WHERE status = 'pending' AND due_at < $1
                    "#,
                )
                .bind(now)
                .execute(self.pool())
                .await?
            }
        };

        Ok(result.rows_affected())
    }
}

impl SqliteRepository {
    /// Distinguishes "no such occurrence" from "guard refused the
    /// transition" after a predicate-guarded UPDATE matched nothing.
    async fn refusal_for(&self, id: Uuid, action: &str) -> Result<CoreError, CoreError> {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM task_occurrences WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(match exists {
            Some(_) => CoreError::Conflict(format!(
                "Occurrence {id} cannot be {action} in its current state"
            )),
            None => CoreError::NotFound(format!("Occurrence {id} not found")),
        })
    }
}
