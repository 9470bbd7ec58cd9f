//! # Chores Core Library
//!
//! The household chore tracking core: recurrence evaluation, the occurrence
//! lifecycle state machine, and reminder scheduling, backed by SQLite.
//!
//! ## Features
//!
//! - **RRULE Recurrence**: RFC 5545-style rules with presets, bounded
//!   expansion, and weekend/holiday exclusion
//! - **Occurrence Lifecycle**: complete, snooze, skip, assign, reopen and
//!   the overdue sweep, with concurrency-safe transition guards
//! - **Reminder Scheduling**: preference-aware reminder instants with quiet
//!   hours, idempotent scheduling, and at-most-once dispatch per slot
//! - **Holiday Awareness**: injectable per-region holiday calendars
//! - **Type Safety**: compile-time checked SQL with sqlx
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`state`]: The occurrence state machine as a closed sum type
//! - [`recurrence`]: Rule validation, expansion, and holiday adjustment
//! - [`holidays`]: Per-region public holiday calendars
//! - [`reminders`]: Reminder instant computation and the delivery boundary
//! - [`repository`]: Data access layer with the Repository pattern
//! - [`jobs`]: Periodic sweep, dispatch, and generation loops
//! - [`error`]: Error taxonomy
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chores_core::{
//!     config::GenerationConfig,
//!     db,
//!     holidays::{HolidayCalendar, Region},
//!     models::NewDefinitionData,
//!     recurrence::RecurrenceEngine,
//!     repository::{
//!         DefinitionRepository, HouseholdRepository, OccurrenceRepository, SqliteRepository,
//!     },
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("chores.db").await?;
//!
//!     let engine = RecurrenceEngine::new(HolidayCalendar::new(Region::France));
//!     let repo = SqliteRepository::new(pool, engine, GenerationConfig::default());
//!
//!     let household = repo.add_household("Flat 12".to_string()).await?;
//!     repo.add_definition(NewDefinitionData {
//!         title: "Take out the bins".to_string(),
//!         rrule: "FREQ=WEEKLY;BYDAY=TU".to_string(),
//!         household_id: Some(household.id),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     let occurrences = repo.generate_for_household(household.id, Some(14)).await?;
//!     println!("Generated {} occurrences", occurrences.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod holidays;
pub mod jobs;
pub mod models;
pub mod recurrence;
pub mod reminders;
pub mod repository;
pub mod state;
