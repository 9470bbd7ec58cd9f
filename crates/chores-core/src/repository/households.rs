use crate::error::CoreError;
use crate::models::Household;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
impl super::HouseholdRepository for SqliteRepository {
    async fn add_household(&self, name: String) -> Result<Household, CoreError> {
        let household = sqlx::query_as(
            r#"INSERT INTO households (id, name, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(household)
    }

    async fn find_household_by_id(&self, id: Uuid) -> Result<Option<Household>, CoreError> {
        let household = sqlx::query_as("SELECT * FROM households WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(household)
    }

    async fn find_households(&self) -> Result<Vec<Household>, CoreError> {
        let households = sqlx::query_as("SELECT * FROM households ORDER BY created_at")
            .fetch_all(self.pool())
            .await?;
        Ok(households)
    }

    async fn add_member(&self, household_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let household = self.find_household_by_id(household_id).await?;
        if household.is_none() {
            return Err(CoreError::NotFound(format!(
                "Household {household_id} not found"
            )));
        }

        // Re-adding an existing member is a no-op.
        sqlx::query(
            r#"INSERT INTO household_members (household_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (household_id, user_id) DO NOTHING
            "#,
        )
        .bind(household_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn remove_member(&self, household_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "DELETE FROM household_members WHERE household_id = $1 AND user_id = $2",
        )
        .bind(household_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "User {user_id} is not a member of household {household_id}"
            )));
        }

        // Assignment is a weak reference: removing the member clears it on
        // that household's occurrences without touching the occurrences.
        sqlx::query(
            r#"UPDATE task_occurrences
            SET assigned_to = NULL
            WHERE assigned_to = $1
              AND task_id IN (SELECT id FROM task_definitions WHERE household_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(household_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn is_member(&self, household_id: Uuid, user_id: Uuid) -> Result<bool, CoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM household_members WHERE household_id = $1 AND user_id = $2",
        )
        .bind(household_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count.0 > 0)
    }
}
