//! Run outcome reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::OperationKind;

/// Terminal status of one entity job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// All items were applied
    Completed,
    /// The job raised an error; dependents were skipped
    Failed,
    /// The job never ran
    Skipped,
}

/// Why a job was skipped without running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A direct or transitive dependency failed
    DependencyFailed {
        /// The entity whose failure caused the skip
        dependency: String,
    },
    /// The entity has no strategy for this operation
    NoStrategy,
}

/// Outcome of a single entity job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOutcome {
    /// Entity name
    pub entity: String,
    /// Terminal status
    pub status: EntityStatus,
    /// Number of items successfully applied
    pub items: usize,
    /// Number of items the strategy dropped during transform
    pub items_dropped: usize,
    /// Present when status is `Skipped`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Present when status is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntityOutcome {
    /// Outcome for a job that applied all of its items
    pub fn completed(entity: impl Into<String>, items: usize, items_dropped: usize) -> Self {
        Self {
            entity: entity.into(),
            status: EntityStatus::Completed,
            items,
            items_dropped,
            skip_reason: None,
            error: None,
        }
    }

    /// Outcome for a failed job
    pub fn failed(entity: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            status: EntityStatus::Failed,
            items: 0,
            items_dropped: 0,
            skip_reason: None,
            error: Some(error.into()),
        }
    }

    /// Outcome for a job that never ran
    pub fn skipped(entity: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            entity: entity.into(),
            status: EntityStatus::Skipped,
            items: 0,
            items_dropped: 0,
            skip_reason: Some(reason),
            error: None,
        }
    }
}

/// Aggregated result of one save or restore run.
///
/// Outcomes are ordered by the execution plan, so the report doubles as
/// a record of the order entities were scheduled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    /// Operation the run performed
    pub operation: OperationKind,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Per-entity outcomes in execution-plan order
    pub outcomes: Vec<EntityOutcome>,
}

impl RunReport {
    /// Whether no job failed
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status != EntityStatus::Failed)
    }

    /// Outcome for the named entity
    pub fn outcome(&self, entity: &str) -> Option<&EntityOutcome> {
        self.outcomes.iter().find(|o| o.entity == entity)
    }

    /// Total items applied across all jobs
    pub fn items_applied(&self) -> usize {
        self.outcomes.iter().map(|o| o.items).sum()
    }

    /// One-line human summary of the run
    pub fn summary(&self) -> String {
        let completed = self.count(EntityStatus::Completed);
        let failed = self.count(EntityStatus::Failed);
        let skipped = self.count(EntityStatus::Skipped);
        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds();
        format!(
            "{} run {}: {} completed, {} failed, {} skipped, {} item(s) in {}ms",
            self.operation,
            self.run_id,
            completed,
            failed,
            skipped,
            self.items_applied(),
            elapsed_ms
        )
    }

    fn count(&self, status: EntityStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == status)
            .count()
    }
}
