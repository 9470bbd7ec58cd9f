use crate::config::GenerationConfig;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    CompletionInput, Household, NewDefinitionData, NotificationPreferences, OccurrenceFilter,
    ReminderNotification, TaskCompletion, TaskDefinition, TaskOccurrence, UpdateDefinitionData,
};
use crate::recurrence::RecurrenceEngine;
use crate::reminders::{Delivery, DispatchSummary};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

// Re-export domain modules
pub mod definitions;
pub mod households;
pub mod occurrences;
pub mod reminders;
pub mod transitions;

// Traits are defined in this module and implemented in respective domain modules

/// Result of a successful completion: the transitioned occurrence plus the
/// completion record inserted in the same transaction.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub occurrence: TaskOccurrence,
    pub completion: TaskCompletion,
}

/// Domain-specific trait for household membership operations
#[async_trait]
pub trait HouseholdRepository {
    async fn add_household(&self, name: String) -> Result<Household, CoreError>;
    async fn find_household_by_id(&self, id: Uuid) -> Result<Option<Household>, CoreError>;
    async fn find_households(&self) -> Result<Vec<Household>, CoreError>;
    async fn add_member(&self, household_id: Uuid, user_id: Uuid) -> Result<(), CoreError>;
    async fn remove_member(&self, household_id: Uuid, user_id: Uuid) -> Result<(), CoreError>;
    async fn is_member(&self, household_id: Uuid, user_id: Uuid) -> Result<bool, CoreError>;
}

/// Domain-specific trait for task definition operations
#[async_trait]
pub trait DefinitionRepository {
    async fn add_definition(&self, data: NewDefinitionData) -> Result<TaskDefinition, CoreError>;
    async fn find_definition_by_id(&self, id: Uuid) -> Result<Option<TaskDefinition>, CoreError>;
    async fn find_definitions_for_household(
        &self,
        household_id: Uuid,
    ) -> Result<Vec<TaskDefinition>, CoreError>;
    async fn find_catalog_definitions(&self) -> Result<Vec<TaskDefinition>, CoreError>;
    async fn copy_catalog_definition(
        &self,
        catalog_id: Uuid,
        household_id: Uuid,
        created_by: Option<Uuid>,
    ) -> Result<TaskDefinition, CoreError>;
    async fn update_definition(
        &self,
        id: Uuid,
        data: UpdateDefinitionData,
    ) -> Result<TaskDefinition, CoreError>;
    async fn delete_definition(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for occurrence generation and lookup
#[async_trait]
pub trait OccurrenceRepository {
    async fn generate_for_definition(
        &self,
        definition_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        max_occurrences: Option<usize>,
    ) -> Result<Vec<TaskOccurrence>, CoreError>;
    async fn generate_for_household(
        &self,
        household_id: Uuid,
        days_ahead: Option<u32>,
    ) -> Result<Vec<TaskOccurrence>, CoreError>;
    async fn find_occurrence_by_id(&self, id: Uuid) -> Result<Option<TaskOccurrence>, CoreError>;
    async fn find_occurrences(
        &self,
        filter: &OccurrenceFilter,
    ) -> Result<Vec<TaskOccurrence>, CoreError>;
    async fn delete_occurrence(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for occurrence state transitions
#[async_trait]
pub trait TransitionRepository {
    async fn complete_occurrence(
        &self,
        id: Uuid,
        input: CompletionInput,
    ) -> Result<CompletionResult, CoreError>;
    async fn snooze_occurrence(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<TaskOccurrence, CoreError>;
    async fn skip_occurrence(&self, id: Uuid) -> Result<TaskOccurrence, CoreError>;
    async fn assign_occurrence(
        &self,
        id: Uuid,
        assignee: Uuid,
    ) -> Result<TaskOccurrence, CoreError>;
    async fn reopen_occurrence(&self, id: Uuid) -> Result<TaskOccurrence, CoreError>;
    async fn sweep_overdue(
        &self,
        household_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<u64, CoreError>;
}

/// Domain-specific trait for reminder scheduling and dispatch
#[async_trait]
pub trait ReminderRepository {
    async fn schedule_for_occurrence(
        &self,
        occurrence_id: Uuid,
        preferences: &NotificationPreferences,
    ) -> Result<Vec<ReminderNotification>, CoreError>;
    async fn dispatch_due(
        &self,
        now: DateTime<Utc>,
        delivery: &dyn Delivery,
        limit: usize,
    ) -> Result<DispatchSummary, CoreError>;
    async fn find_reminders_for_occurrence(
        &self,
        occurrence_id: Uuid,
    ) -> Result<Vec<ReminderNotification>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    HouseholdRepository
    + DefinitionRepository
    + OccurrenceRepository
    + TransitionRepository
    + ReminderRepository
{
    // This trait automatically composes all domain-specific repositories
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    engine: RecurrenceEngine,
    config: GenerationConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, engine: RecurrenceEngine, config: GenerationConfig) -> Self {
        Self {
            pool,
            engine,
            config,
        }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn engine(&self) -> &RecurrenceEngine {
        &self.engine
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

impl Repository for SqliteRepository {}
