use crate::error::CoreError;
use crate::models::{OccurrenceFilter, TaskOccurrence};
use crate::repository::{DefinitionRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

#[async_trait]
impl super::OccurrenceRepository for SqliteRepository {
    async fn generate_for_definition(
        &self,
        definition_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        max_occurrences: Option<usize>,
    ) -> Result<Vec<TaskOccurrence>, CoreError> {
        let definition = self
            .find_definition_by_id(definition_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Definition {definition_id} not found")))?;

        // An invalid rule means "nothing to generate", not an error.
        if let Err(e) = self.engine().validate(&definition.rrule) {
            tracing::warn!(
                definition_id = %definition_id,
                rule = %definition.rrule,
                error = %e,
                "definition has an invalid recurrence rule, skipping generation"
            );
            return Ok(Vec::new());
        }

        // The server ceiling binds regardless of the caller-supplied cap.
        let ceiling = self.config().max_occurrences_per_call;
        let cap = max_occurrences.unwrap_or(ceiling).min(ceiling);

        let dates = self
            .engine()
            .expand(&definition.rrule, start, end, false, false, cap)?;

        let mut occurrences = Vec::with_capacity(dates.len());
        for (date, _) in dates {
            let due_at = date.and_time(end_of_day()).and_utc();

            // The (task_id, scheduled_date) constraint is the source of truth
            // for "already generated"; on conflict, return the existing row.
            let inserted: Option<TaskOccurrence> = sqlx::query_as(
                r#"INSERT INTO task_occurrences
                    (id, task_id, scheduled_date, due_at, status, assigned_to, snoozed_until, created_at)
                VALUES ($1, $2, $3, $4, 'pending', NULL, NULL, $5)
                ON CONFLICT (task_id, scheduled_date) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(definition_id)
            .bind(date)
            .bind(due_at)
            .bind(Utc::now())
            .fetch_optional(self.pool())
            .await?;

            let occurrence = match inserted {
                Some(occurrence) => occurrence,
                None => {
                    sqlx::query_as(
                        "SELECT * FROM task_occurrences WHERE task_id = $1 AND scheduled_date = $2",
                    )
                    .bind(definition_id)
                    .bind(date)
                    .fetch_one(self.pool())
                    .await?
                }
            };
            occurrences.push(occurrence);
        }

        Ok(occurrences)
    }

    async fn generate_for_household(
        &self,
        household_id: Uuid,
        days_ahead: Option<u32>,
    ) -> Result<Vec<TaskOccurrence>, CoreError> {
        let horizon = self.config().days_ahead;
        let days = days_ahead.unwrap_or(horizon).clamp(1, horizon);

        let start = Utc::now().date_naive();
        let end = start + Duration::days(days as i64);

        let definitions = self.find_definitions_for_household(household_id).await?;

        let mut occurrences = Vec::new();
        for definition in definitions {
            // One bad definition must not abort generation for the rest.
            match self
                .generate_for_definition(definition.id, start, end, None)
                .await
            {
                Ok(generated) => occurrences.extend(generated),
                Err(e) => {
                    tracing::warn!(
                        definition_id = %definition.id,
                        error = %e,
                        "generation failed for definition, continuing"
                    );
                }
            }
        }

        Ok(occurrences)
    }

    async fn find_occurrence_by_id(&self, id: Uuid) -> Result<Option<TaskOccurrence>, CoreError> {
        let occurrence = sqlx::query_as("SELECT * FROM task_occurrences WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(occurrence)
    }

    async fn find_occurrences(
        &self,
        filter: &OccurrenceFilter,
    ) -> Result<Vec<TaskOccurrence>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"SELECT o.* FROM task_occurrences o
            JOIN task_definitions td ON o.task_id = td.id
            WHERE 1 = 1
            "#,
        );

        if let Some(household_id) = filter.household_id {
            qb.push(" AND td.household_id = ");
            qb.push_bind(household_id);
        }
        if let Some(start_date) = filter.start_date {
            qb.push(" AND o.scheduled_date >= ");
            qb.push_bind(start_date);
        }
        if let Some(end_date) = filter.end_date {
            qb.push(" AND o.scheduled_date <= ");
            qb.push_bind(end_date);
        }
        if let Some(status) = filter.status {
            qb.push(" AND o.status = ");
            qb.push_bind(status);
        }
        if let Some(assigned_to) = filter.assigned_to {
            qb.push(" AND o.assigned_to = ");
            qb.push_bind(assigned_to);
        }
        if let Some(room_id) = filter.room_id {
            qb.push(" AND td.room_id = ");
            qb.push_bind(room_id);
        }

        qb.push(" ORDER BY o.scheduled_date, o.due_at");

        let occurrences = qb
            .build_query_as::<TaskOccurrence>()
            .fetch_all(self.pool())
            .await?;
        Ok(occurrences)
    }

    async fn delete_occurrence(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM task_occurrences WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Occurrence {id} not found")));
        }
        Ok(())
    }
}
