//! End-to-end facade: plan, prepare, and execute one run

use tracing::info;

use crate::context::StrategyContext;
use crate::error::Result;
use crate::factory::StrategyFactory;
use crate::orchestrator::{JobOrchestrator, OrchestratorConfig};
use crate::registry::EntityRegistry;
use crate::report::RunReport;
use crate::strategy::OperationKind;

/// Plans and executes one run with the default orchestrator
/// configuration.
///
/// The registry is expected to have activation loaded and dependencies
/// validated; this function derives the execution plan, validates and
/// builds every strategy, then drives the jobs to completion.
pub async fn execute(
    registry: &EntityRegistry,
    context: &StrategyContext,
    operation: OperationKind,
) -> Result<RunReport> {
    execute_with_config(registry, context, operation, OrchestratorConfig::default()).await
}

/// Plans and executes one run with explicit orchestrator configuration
pub async fn execute_with_config(
    registry: &EntityRegistry,
    context: &StrategyContext,
    operation: OperationKind,
    config: OrchestratorConfig,
) -> Result<RunReport> {
    let plan = registry.enabled_descriptors()?;
    info!(
        operation = %operation,
        entity_count = plan.len(),
        "Planned run"
    );

    // Strategies always see the authoritative activation state, no
    // matter how the caller assembled the context.
    let context = context.clone().with_activation(registry.activation_map());

    let factory = StrategyFactory::new(operation);
    let jobs = factory.prepare(&plan, &context)?;

    JobOrchestrator::with_config(config).run(operation, jobs).await
}
