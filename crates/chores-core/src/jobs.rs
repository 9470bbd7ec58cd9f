//! Periodic maintenance loops: the overdue sweep, reminder dispatch, and
//! daily occurrence generation.
//!
//! Each loop runs on its own tokio task with its own cadence; a failed cycle
//! is logged and the loop keeps ticking.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::JobConfig;
use crate::reminders::Delivery;
use crate::repository::Repository;

pub struct JobRunner {
    repository: Arc<dyn Repository + Send + Sync>,
    delivery: Arc<dyn Delivery>,
    config: JobConfig,
}

impl JobRunner {
    pub fn new(
        repository: Arc<dyn Repository + Send + Sync>,
        delivery: Arc<dyn Delivery>,
        config: JobConfig,
    ) -> Self {
        Self {
            repository,
            delivery,
            config,
        }
    }

    /// Spawns the three loops and returns their handles. Dropping the
    /// handles detaches the loops; aborting them stops the jobs.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_sweeper(),
            self.spawn_dispatcher(),
            self.spawn_generator(),
        ]
    }

    fn spawn_sweeper(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match repository.sweep_overdue(None, Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "swept pending occurrences to overdue"),
                    Err(e) => tracing::error!(error = %e, "overdue sweep failed"),
                }
            }
        })
    }

    fn spawn_dispatcher(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let delivery = Arc::clone(&self.delivery);
        let interval = self.config.dispatch_interval;
        let batch = self.config.dispatch_batch;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match repository
                    .dispatch_due(Utc::now(), delivery.as_ref(), batch)
                    .await
                {
                    Ok(summary) if summary.processed > 0 => {
                        tracing::info!(
                            processed = summary.processed,
                            sent = summary.sent,
                            failed = summary.failed,
                            "dispatched due reminders"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "reminder dispatch failed"),
                }
            }
        })
    }

    fn spawn_generator(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let interval = self.config.generation_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = generate_all(repository.as_ref()).await {
                    tracing::error!(error = %e, "scheduled generation failed");
                }
            }
        })
    }
}

/// One generation pass over every household, using the configured horizon.
/// Per-household failures are logged and do not stop the pass.
pub async fn generate_all(
    repository: &(dyn Repository + Send + Sync),
) -> Result<usize, crate::error::CoreError> {
    let households = repository.find_households().await?;

    let mut generated = 0;
    for household in households {
        match repository.generate_for_household(household.id, None).await {
            Ok(occurrences) => generated += occurrences.len(),
            Err(e) => {
                tracing::warn!(
                    household_id = %household.id,
                    error = %e,
                    "generation failed for household, continuing"
                );
            }
        }
    }
    Ok(generated)
}
