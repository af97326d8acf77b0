//! Dependency-gated parallel execution of entity jobs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{JobResult, OrchestrationError, Result};
use crate::factory::PreparedJob;
use crate::registry::transitive_dependents;
use crate::report::{EntityOutcome, RunReport, SkipReason};
use crate::shared::SharedRunContext;
use crate::strategy::{EntityStrategy, OperationKind};

/// Lifecycle of one entity job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting on dependencies
    Pending,
    /// All dependencies satisfied, waiting for a worker
    Ready,
    /// Executing on a worker
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Never ran
    Skipped,
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of jobs executing at once; zero is treated as one
    pub worker_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { worker_limit: 4 }
    }
}

/// Item totals reported by one finished job
#[derive(Debug, Clone, Copy, Default)]
struct ItemCounts {
    applied: usize,
    dropped: usize,
}

struct JobCompletion {
    entity: String,
    result: JobResult<ItemCounts>,
}

/// Executes prepared jobs with bounded parallelism, gating each job on
/// completion of its declared dependencies.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
}

impl Default for JobOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl JobOrchestrator {
    /// Creates an orchestrator with the default configuration
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    /// Creates an orchestrator with the given configuration
    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    /// Runs every job to a terminal state and reports all outcomes.
    ///
    /// Jobs whose dependencies are all satisfied run concurrently, up
    /// to the worker limit. A failed job marks its direct and
    /// transitive dependents skipped; unrelated jobs keep running, and
    /// per-job failures are aggregated into the report rather than
    /// returned as errors. `Err` is reserved for scheduler invariant
    /// breaches, which abort the run instead of hanging it.
    pub async fn run(
        &self,
        operation: OperationKind,
        jobs: Vec<PreparedJob>,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let worker_limit = self.config.worker_limit.max(1);
        info!(
            run_id = %run_id,
            operation = %operation,
            job_count = jobs.len(),
            worker_limit = worker_limit,
            "Starting run"
        );

        let mut plan_order = Vec::with_capacity(jobs.len());
        let mut dependencies: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut pending: BTreeMap<String, Box<dyn EntityStrategy>> = BTreeMap::new();
        let mut states: BTreeMap<String, JobState> = BTreeMap::new();
        let mut outcomes: BTreeMap<String, EntityOutcome> = BTreeMap::new();
        let mut satisfied: BTreeSet<String> = BTreeSet::new();

        for job in jobs {
            let PreparedJob {
                name,
                dependencies: deps,
                strategy,
            } = job;
            if dependencies.contains_key(&name) {
                return Err(OrchestrationError::internal(format!(
                    "duplicate job `{name}` in plan"
                )));
            }
            plan_order.push(name.clone());
            dependencies.insert(name.clone(), deps);
            match strategy {
                Some(strategy) => {
                    states.insert(name.clone(), JobState::Pending);
                    pending.insert(name, strategy);
                }
                None => {
                    debug!(entity = %name, operation = %operation, "No strategy; job skipped");
                    states.insert(name.clone(), JobState::Skipped);
                    outcomes.insert(
                        name.clone(),
                        EntityOutcome::skipped(&name, SkipReason::NoStrategy),
                    );
                    satisfied.insert(name);
                }
            }
        }

        let shared = Arc::new(SharedRunContext::new());
        let semaphore = Arc::new(Semaphore::new(worker_limit));
        let (tx, mut rx) = mpsc::unbounded_channel::<JobCompletion>();
        let mut running = 0usize;

        loop {
            let ready: Vec<String> = pending
                .keys()
                .filter(|name| {
                    dependencies
                        .get(*name)
                        .map(|deps| deps.iter().all(|dep| satisfied.contains(dep)))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();

            for name in ready {
                let Some(strategy) = pending.remove(&name) else {
                    continue;
                };
                states.insert(name.clone(), JobState::Ready);
                debug!(entity = %name, "Job ready");

                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| {
                        OrchestrationError::internal("worker pool closed unexpectedly")
                    })?;

                states.insert(name.clone(), JobState::Running);
                debug!(entity = %name, "Job dispatched");
                running += 1;

                let tx = tx.clone();
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _permit = permit;
                    let result = drive_strategy(strategy, &shared).await;
                    let _ = tx.send(JobCompletion {
                        entity: name,
                        result,
                    });
                });
            }

            if running == 0 {
                if pending.is_empty() {
                    break;
                }
                let stuck: Vec<String> = pending.keys().cloned().collect();
                error!(
                    stuck_entities = ?stuck,
                    "Scheduler made no progress with jobs pending"
                );
                return Err(OrchestrationError::internal(format!(
                    "no job can become ready; stuck entities: {}",
                    stuck.join(", ")
                )));
            }

            let Some(completion) = rx.recv().await else {
                return Err(OrchestrationError::internal(
                    "completion channel closed unexpectedly",
                ));
            };
            running -= 1;

            match completion.result {
                Ok(counts) => {
                    debug!(
                        entity = %completion.entity,
                        items = counts.applied,
                        items_dropped = counts.dropped,
                        "Job completed"
                    );
                    states.insert(completion.entity.clone(), JobState::Completed);
                    outcomes.insert(
                        completion.entity.clone(),
                        EntityOutcome::completed(&completion.entity, counts.applied, counts.dropped),
                    );
                    satisfied.insert(completion.entity);
                }
                Err(err) => {
                    warn!(entity = %completion.entity, error = %err, "Job failed");
                    states.insert(completion.entity.clone(), JobState::Failed);
                    outcomes.insert(
                        completion.entity.clone(),
                        EntityOutcome::failed(&completion.entity, err.to_string()),
                    );

                    for dependent in transitive_dependents(&dependencies, &completion.entity) {
                        if pending.remove(&dependent).is_some() {
                            warn!(
                                entity = %dependent,
                                failed_dependency = %completion.entity,
                                "Skipping job due to failed dependency"
                            );
                            states.insert(dependent.clone(), JobState::Skipped);
                            outcomes.insert(
                                dependent.clone(),
                                EntityOutcome::skipped(
                                    &dependent,
                                    SkipReason::DependencyFailed {
                                        dependency: completion.entity.clone(),
                                    },
                                ),
                            );
                        }
                    }
                }
            }
        }

        let mut ordered = Vec::with_capacity(plan_order.len());
        for name in &plan_order {
            match outcomes.remove(name) {
                Some(outcome) => ordered.push(outcome),
                None => {
                    return Err(OrchestrationError::internal(format!(
                        "job `{}` ended in non-terminal state {:?}",
                        name,
                        states.get(name).copied().unwrap_or(JobState::Pending)
                    )));
                }
            }
        }

        let report = RunReport {
            run_id,
            operation,
            started_at,
            finished_at: Utc::now(),
            outcomes: ordered,
        };
        info!(
            run_id = %run_id,
            operation = %operation,
            success = report.is_success(),
            items = report.items_applied(),
            "Run finished"
        );
        Ok(report)
    }
}

/// Drives one strategy through its item pipeline
async fn drive_strategy(
    mut strategy: Box<dyn EntityStrategy>,
    shared: &SharedRunContext,
) -> JobResult<ItemCounts> {
    let items = strategy.load().await?;
    let mut counts = ItemCounts::default();
    for item in items {
        match strategy.transform(item, shared).await? {
            Some(ready) => {
                let created = strategy.create(ready).await?;
                strategy.after_create(created, shared).await?;
                counts.applied += 1;
            }
            None => counts.dropped += 1,
        }
    }
    Ok(counts)
}
