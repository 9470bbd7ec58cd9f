use crate::error::CoreError;
use crate::models::{NewDefinitionData, TaskDefinition, UpdateDefinitionData};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[async_trait]
impl super::DefinitionRepository for SqliteRepository {
    async fn add_definition(&self, data: NewDefinitionData) -> Result<TaskDefinition, CoreError> {
        // A definition is either household-scoped or a catalog template,
        // never both or neither.
        match (data.household_id.is_some(), data.is_catalog) {
            (true, false) | (false, true) => {}
            _ => {
                return Err(CoreError::InvalidInput(
                    "A definition must have either a household or the catalog flag, not both"
                        .to_string(),
                ))
            }
        }

        self.engine().validate(&data.rrule)?;

        let definition = sqlx::query_as(
            r#"INSERT INTO task_definitions
                (id, title, description, rrule, estimated_minutes, room_id,
                 household_id, is_catalog, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(data.title)
        .bind(data.description)
        .bind(data.rrule)
        .bind(data.estimated_minutes)
        .bind(data.room_id)
        .bind(data.household_id)
        .bind(data.is_catalog)
        .bind(data.created_by)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(definition)
    }

    async fn find_definition_by_id(&self, id: Uuid) -> Result<Option<TaskDefinition>, CoreError> {
        let definition = sqlx::query_as("SELECT * FROM task_definitions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(definition)
    }

    async fn find_definitions_for_household(
        &self,
        household_id: Uuid,
    ) -> Result<Vec<TaskDefinition>, CoreError> {
        let definitions = sqlx::query_as(
            "SELECT * FROM task_definitions WHERE household_id = $1 ORDER BY created_at",
        )
        .bind(household_id)
        .fetch_all(self.pool())
        .await?;
        Ok(definitions)
    }

    async fn find_catalog_definitions(&self) -> Result<Vec<TaskDefinition>, CoreError> {
        let definitions =
            sqlx::query_as("SELECT * FROM task_definitions WHERE is_catalog = 1 ORDER BY title")
                .fetch_all(self.pool())
                .await?;
        Ok(definitions)
    }

    async fn copy_catalog_definition(
        &self,
        catalog_id: Uuid,
        household_id: Uuid,
        created_by: Option<Uuid>,
    ) -> Result<TaskDefinition, CoreError> {
        let template = self
            .find_definition_by_id(catalog_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Definition {catalog_id} not found")))?;

        if !template.is_catalog {
            return Err(CoreError::InvalidInput(format!(
                "Definition {catalog_id} is not a catalog template"
            )));
        }

        let copy = sqlx::query_as(
            r#"INSERT INTO task_definitions
                (id, title, description, rrule, estimated_minutes, room_id,
                 household_id, is_catalog, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, NULL, $6, 0, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(template.title)
        .bind(template.description)
        .bind(template.rrule)
        .bind(template.estimated_minutes)
        .bind(household_id)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(copy)
    }

    async fn update_definition(
        &self,
        id: Uuid,
        data: UpdateDefinitionData,
    ) -> Result<TaskDefinition, CoreError> {
        if let Some(rrule) = &data.rrule {
            self.engine().validate(rrule)?;
        }

        let mut tx = self.pool().begin().await?;

        let current: Option<TaskDefinition> =
            sqlx::query_as("SELECT * FROM task_definitions WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current =
            current.ok_or_else(|| CoreError::NotFound(format!("Definition {id} not found")))?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE task_definitions SET ");
        let mut updated = false;

        if let Some(title) = &data.title {
            qb.push("title = ");
            qb.push_bind(title);
            updated = true;
        }
        if let Some(description) = &data.description {
            if updated {
                qb.push(", ");
            }
            qb.push("description = ");
            qb.push_bind(description.clone());
            updated = true;
        }
        if let Some(rrule) = &data.rrule {
            if updated {
                qb.push(", ");
            }
            qb.push("rrule = ");
            qb.push_bind(rrule);
            updated = true;
        }
        if let Some(estimated_minutes) = &data.estimated_minutes {
            if updated {
                qb.push(", ");
            }
            qb.push("estimated_minutes = ");
            qb.push_bind(*estimated_minutes);
            updated = true;
        }
        if let Some(room_id) = &data.room_id {
            if updated {
                qb.push(", ");
            }
            qb.push("room_id = ");
            qb.push_bind(*room_id);
            updated = true;
        }

        if !updated {
            tx.commit().await?;
            return Ok(current);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut *tx).await?;

        let definition: TaskDefinition =
            sqlx::query_as("SELECT * FROM task_definitions WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(definition)
    }

    async fn delete_definition(&self, id: Uuid) -> Result<(), CoreError> {
        // Occurrences (and their completions/reminders) go with it.
        let result = sqlx::query("DELETE FROM task_definitions WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Definition {id} not found")));
        }
        Ok(())
    }
}
