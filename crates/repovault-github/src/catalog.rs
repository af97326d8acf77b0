//! Built-in entity catalog.
//!
//! One descriptor per entity kind, wiring its snapshot collection name,
//! dependency edges, service requirements, and strategy factories into
//! the orchestration registry. Dependency edges mirror data references:
//! issues and pull requests carry label names, comments and sub-issue
//! links carry issue numbers.

use repovault_orchestration::{
    EntityDescriptor, EntityRegistry, EntityStrategy, Result, ServiceKind, StrategyContext,
};

use crate::strategies::{
    RestoreComments, RestoreIssues, RestoreLabels, RestorePullRequests, RestoreSubIssues,
    SaveComments, SaveIssues, SaveLabels, SavePullRequests, SaveSubIssues,
};

/// Entity and snapshot collection name for labels
pub const LABELS: &str = "labels";
/// Entity and snapshot collection name for issues
pub const ISSUES: &str = "issues";
/// Entity and snapshot collection name for issue comments
pub const COMMENTS: &str = "comments";
/// Entity and snapshot collection name for pull requests
pub const PULL_REQUESTS: &str = "pull_requests";
/// Entity and snapshot collection name for sub-issue links
pub const SUB_ISSUES: &str = "sub_issues";

type BuiltStrategy = Result<Option<Box<dyn EntityStrategy>>>;

fn save_labels(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(SaveLabels::from_context(context)?)))
}

fn restore_labels(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(RestoreLabels::from_context(context)?)))
}

fn save_issues(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(SaveIssues::from_context(context)?)))
}

fn restore_issues(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(RestoreIssues::from_context(context)?)))
}

fn save_comments(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(SaveComments::from_context(context)?)))
}

fn restore_comments(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(RestoreComments::from_context(context)?)))
}

fn save_pull_requests(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(SavePullRequests::from_context(context)?)))
}

fn restore_pull_requests(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(RestorePullRequests::from_context(context)?)))
}

fn save_sub_issues(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(SaveSubIssues::from_context(context)?)))
}

fn restore_sub_issues(context: &StrategyContext) -> BuiltStrategy {
    Ok(Some(Box::new(RestoreSubIssues::from_context(context)?)))
}

/// Descriptors for every built-in entity
pub fn builtin_descriptors() -> Vec<EntityDescriptor> {
    let data_services = [ServiceKind::RepoClient, ServiceKind::SnapshotStore];

    vec![
        EntityDescriptor::new(LABELS, save_labels, restore_labels)
            .with_save_requirements(data_services)
            .with_restore_requirements([
                ServiceKind::RepoClient,
                ServiceKind::SnapshotStore,
                ServiceKind::ConflictPolicy,
            ]),
        EntityDescriptor::new(ISSUES, save_issues, restore_issues)
            .with_dependencies([LABELS])
            .with_save_requirements(data_services)
            .with_restore_requirements(data_services),
        EntityDescriptor::new(COMMENTS, save_comments, restore_comments)
            .with_dependencies([ISSUES])
            .with_save_requirements(data_services)
            .with_restore_requirements(data_services),
        EntityDescriptor::new(PULL_REQUESTS, save_pull_requests, restore_pull_requests)
            .with_dependencies([LABELS])
            .with_save_requirements(data_services)
            .with_restore_requirements(data_services),
        EntityDescriptor::new(SUB_ISSUES, save_sub_issues, restore_sub_issues)
            .with_dependencies([ISSUES])
            .with_save_requirements(data_services)
            .with_restore_requirements(data_services),
    ]
}

/// Registry pre-loaded with every built-in entity
pub fn builtin_registry() -> Result<EntityRegistry> {
    EntityRegistry::with_descriptors(builtin_descriptors())
}
