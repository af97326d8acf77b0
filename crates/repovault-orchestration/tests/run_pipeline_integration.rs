//! Integration tests for the full planning and execution pipeline:
//! registry, activation, validation, factory, and orchestrator working
//! together through the `run` facade.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use repovault_orchestration::{
    execute, Activation, EntityDescriptor, EntityRegistry, EntityStatus, EntityStrategy, JobError,
    JobResult, OperationKind, Result, ServiceKind, SharedRunContext, SkipReason, StrategyContext,
};
use serde_json::{json, Value};

struct Scripted {
    items: usize,
    fail: bool,
}

#[async_trait]
impl EntityStrategy for Scripted {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        if self.fail {
            return Err(JobError::api("upstream returned 500"));
        }
        Ok((0..self.items).map(|i| json!({ "n": i })).collect())
    }

    async fn transform(
        &mut self,
        item: Value,
        _shared: &SharedRunContext,
    ) -> JobResult<Option<Value>> {
        Ok(Some(item))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}

fn three_items(_context: &StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>> {
    Ok(Some(Box::new(Scripted {
        items: 3,
        fail: false,
    })))
}

fn failing(_context: &StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>> {
    Ok(Some(Box::new(Scripted {
        items: 0,
        fail: true,
    })))
}

fn activation(entries: &[(&str, Activation)]) -> BTreeMap<String, Activation> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[tokio::test]
async fn test_run_reports_outcomes_in_dependency_order() {
    let registry = EntityRegistry::with_descriptors([
        EntityDescriptor::new("comments", three_items, three_items)
            .with_dependencies(["issues"]),
        EntityDescriptor::new("issues", three_items, three_items).with_dependencies(["labels"]),
        EntityDescriptor::new("labels", three_items, three_items),
    ])
    .unwrap();

    let report = execute(&registry, &StrategyContext::new(), OperationKind::Restore)
        .await
        .unwrap();

    assert!(report.is_success());
    let entities: Vec<&str> = report.outcomes.iter().map(|o| o.entity.as_str()).collect();
    assert_eq!(entities, vec!["labels", "issues", "comments"]);
    assert_eq!(report.items_applied(), 9);
}

#[tokio::test]
async fn test_failed_entity_isolates_its_dependents() {
    let registry = EntityRegistry::with_descriptors([
        EntityDescriptor::new("labels", three_items, three_items),
        EntityDescriptor::new("issues", failing, failing).with_dependencies(["labels"]),
        EntityDescriptor::new("comments", three_items, three_items)
            .with_dependencies(["issues"]),
        EntityDescriptor::new("pull_requests", three_items, three_items)
            .with_dependencies(["labels"]),
    ])
    .unwrap();

    let report = execute(&registry, &StrategyContext::new(), OperationKind::Restore)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.outcome("labels").unwrap().status, EntityStatus::Completed);
    assert_eq!(report.outcome("issues").unwrap().status, EntityStatus::Failed);
    assert_eq!(
        report.outcome("comments").unwrap().skip_reason,
        Some(SkipReason::DependencyFailed {
            dependency: "issues".to_string()
        })
    );
    assert_eq!(
        report.outcome("pull_requests").unwrap().status,
        EntityStatus::Completed
    );
}

#[tokio::test]
async fn test_disabled_dependency_cascades_out_of_the_plan() {
    let mut registry = EntityRegistry::with_descriptors([
        EntityDescriptor::new("labels", three_items, three_items),
        EntityDescriptor::new("issues", three_items, three_items).with_dependencies(["labels"]),
        EntityDescriptor::new("comments", three_items, three_items)
            .with_dependencies(["issues"]),
        EntityDescriptor::new("releases", three_items, three_items),
    ])
    .unwrap();

    registry
        .load_activation(&activation(&[("labels", Activation::Disabled)]), false)
        .unwrap();
    let auto_disabled = registry.validate_dependencies(false).unwrap();
    assert_eq!(
        auto_disabled,
        vec!["issues".to_string(), "comments".to_string()]
    );

    let report = execute(&registry, &StrategyContext::new(), OperationKind::Save)
        .await
        .unwrap();

    let entities: Vec<&str> = report.outcomes.iter().map(|o| o.entity.as_str()).collect();
    assert_eq!(entities, vec!["releases"]);
}

static BUILT: AtomicUsize = AtomicUsize::new(0);

fn counting(_context: &StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>> {
    BUILT.fetch_add(1, Ordering::SeqCst);
    Ok(Some(Box::new(Scripted {
        items: 0,
        fail: false,
    })))
}

#[tokio::test]
async fn test_missing_services_abort_before_any_strategy_builds() {
    BUILT.store(0, Ordering::SeqCst);

    let registry = EntityRegistry::with_descriptors([
        EntityDescriptor::new("labels", counting, counting)
            .with_restore_requirements([ServiceKind::ConflictPolicy]),
        EntityDescriptor::new("issues", counting, counting)
            .with_dependencies(["labels"])
            .with_restore_requirements([ServiceKind::SnapshotStore]),
    ])
    .unwrap();

    let error = execute(&registry, &StrategyContext::new(), OperationKind::Restore)
        .await
        .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("conflict policy required by `labels` for restore"));
    assert!(message.contains("snapshot store required by `issues` for restore"));
    assert_eq!(BUILT.load(Ordering::SeqCst), 0);
}

fn broken(_context: &StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>> {
    Err(repovault_orchestration::OrchestrationError::configuration(
        "credentials not configured",
    ))
}

#[tokio::test]
async fn test_construction_failure_aborts_the_run() {
    let registry = EntityRegistry::with_descriptors([EntityDescriptor::new(
        "issues", broken, broken,
    )])
    .unwrap();

    let error = execute(&registry, &StrategyContext::new(), OperationKind::Save)
        .await
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Failed to construct save strategy for `issues`: Configuration error: credentials not configured"
    );
}

fn selective(context: &StrategyContext) -> Result<Option<Box<dyn EntityStrategy>>> {
    let activation = context.activation_for("issues");
    let items = [1u64, 2, 3]
        .iter()
        .filter(|number| activation.selects(**number))
        .count();
    Ok(Some(Box::new(Scripted { items, fail: false })))
}

#[tokio::test]
async fn test_selected_activation_reaches_strategies_through_the_context() {
    let mut registry = EntityRegistry::with_descriptors([EntityDescriptor::new(
        "issues", selective, selective,
    )])
    .unwrap();

    registry
        .load_activation(
            &activation(&[(
                "issues",
                Activation::Selected([2, 3].into_iter().collect()),
            )]),
            false,
        )
        .unwrap();
    registry.validate_dependencies(false).unwrap();

    let report = execute(&registry, &StrategyContext::new(), OperationKind::Restore)
        .await
        .unwrap();

    assert_eq!(report.outcome("issues").unwrap().items, 2);
}
