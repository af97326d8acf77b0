//! Strategy construction with up-front service validation

use std::fmt;

use tracing::{debug, info};

use crate::context::StrategyContext;
use crate::error::{OrchestrationError, Result, ServiceMiss};
use crate::registry::EntityDescriptor;
use crate::strategy::{EntityStrategy, OperationKind};

/// One entity's job, ready for the orchestrator.
///
/// `strategy` is `None` when the entity opted out of the operation;
/// such jobs are reported as skipped but still satisfy their
/// dependents.
pub struct PreparedJob {
    /// Entity name
    pub name: String,
    /// Names of entities that must complete first
    pub dependencies: Vec<String>,
    /// The strategy to drive, if the entity participates
    pub strategy: Option<Box<dyn EntityStrategy>>,
}

impl fmt::Debug for PreparedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedJob")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("has_strategy", &self.strategy.is_some())
            .finish()
    }
}

/// Builds strategies for an execution plan, guaranteeing every service
/// requirement is satisfied before any strategy is constructed.
#[derive(Debug, Clone, Copy)]
pub struct StrategyFactory {
    operation: OperationKind,
}

impl StrategyFactory {
    /// Creates a factory for the given operation
    pub fn new(operation: OperationKind) -> Self {
        Self { operation }
    }

    /// Validates and constructs strategies for `plan`, in plan order.
    ///
    /// Requirement checking covers the whole plan first and reports
    /// every unmet (entity, operation, service) triple in one error, so
    /// a misconfigured run surfaces all of its problems at once and no
    /// factory runs at all. Factory failures abort immediately, wrapped
    /// with the entity name and operation.
    pub fn prepare(
        &self,
        plan: &[&EntityDescriptor],
        context: &StrategyContext,
    ) -> Result<Vec<PreparedJob>> {
        let mut misses = Vec::new();
        for descriptor in plan {
            for &service in descriptor.requirements_for(self.operation) {
                if !context.provides(service) {
                    misses.push(ServiceMiss {
                        entity: descriptor.name.clone(),
                        operation: self.operation,
                        service,
                    });
                }
            }
        }
        if !misses.is_empty() {
            return Err(OrchestrationError::missing_services(misses));
        }

        let mut jobs = Vec::with_capacity(plan.len());
        for descriptor in plan {
            let strategy = (descriptor.factory_for(self.operation))(context).map_err(|err| {
                OrchestrationError::construction(&descriptor.name, self.operation, err.to_string())
            })?;

            if strategy.is_none() {
                debug!(
                    entity = %descriptor.name,
                    operation = %self.operation,
                    "Entity opted out of operation"
                );
            }
            jobs.push(PreparedJob {
                name: descriptor.name.clone(),
                dependencies: descriptor.dependencies.clone(),
                strategy,
            });
        }

        info!(
            job_count = jobs.len(),
            operation = %self.operation,
            "Prepared entity strategies"
        );
        Ok(jobs)
    }
}
