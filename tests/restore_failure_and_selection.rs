//! Failure isolation, selective activation, and conflict policy
//! behavior of end-to-end restore runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use repovault_domain::{Issue, IssueComment, Label, PullRequest, SubIssueLink};
use repovault_github::{
    builtin_registry, FaultPoint, InMemoryRepoClient, InMemorySnapshotStore, COMMENTS, ISSUES,
    LABELS, PULL_REQUESTS, SUB_ISSUES,
};
use repovault_orchestration::{
    execute, Activation, ConflictPolicy, EntityStatus, OperationKind, RepoDataClient, SkipReason,
    StrategyContext,
};

/// Builds a source repository with one label, issues #1 and #2 linked
/// parent to child, a comment on each issue, and pull request #3.
async fn seeded_source() -> Arc<InMemoryRepoClient> {
    let client = Arc::new(
        InMemoryRepoClient::new().with_labels(vec![Label::new("bug", "d73a4a")]),
    );

    let parent = client
        .create_issue(Issue::new(0, "Epic", "octocat"))
        .await
        .unwrap();
    let child = client
        .create_issue(Issue::new(0, "Task", "hubot"))
        .await
        .unwrap();
    client
        .create_comment(IssueComment::new(parent.number, "first", "octocat"))
        .await
        .unwrap();
    client
        .create_comment(IssueComment::new(child.number, "second", "hubot"))
        .await
        .unwrap();
    client
        .create_pull_request(PullRequest::new(0, "Fix", "topic", "main"))
        .await
        .unwrap();
    client
        .create_sub_issue_link(SubIssueLink::new(parent.number, child.number))
        .await
        .unwrap();

    client
}

/// Saves the source repository and returns the populated snapshot
async fn snapshot_of(client: Arc<InMemoryRepoClient>) -> Arc<InMemorySnapshotStore> {
    let store = Arc::new(InMemorySnapshotStore::new());
    let context = StrategyContext::new()
        .with_repo_client(client)
        .with_snapshot_store(store.clone());
    let registry = builtin_registry().unwrap();

    let report = execute(&registry, &context, OperationKind::Save).await.unwrap();
    assert!(report.is_success());
    store
}

fn dependency_failed(report_dependency: &str) -> Option<SkipReason> {
    Some(SkipReason::DependencyFailed {
        dependency: report_dependency.to_string(),
    })
}

#[tokio::test]
async fn test_issue_failure_skips_dependents_but_not_siblings() {
    let store = snapshot_of(seeded_source().await).await;
    let target = Arc::new(InMemoryRepoClient::new().with_fault(FaultPoint::CreateIssue));
    let context = StrategyContext::new()
        .with_repo_client(target.clone())
        .with_snapshot_store(store)
        .with_conflict_policy(ConflictPolicy::Skip);
    let registry = builtin_registry().unwrap();

    let report = execute(&registry, &context, OperationKind::Restore)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.outcome(LABELS).unwrap().status, EntityStatus::Completed);
    assert_eq!(
        report.outcome(PULL_REQUESTS).unwrap().status,
        EntityStatus::Completed
    );

    let issues = report.outcome(ISSUES).unwrap();
    assert_eq!(issues.status, EntityStatus::Failed);
    assert!(issues.error.as_deref().unwrap_or("").contains("injected fault"));

    for entity in [COMMENTS, SUB_ISSUES] {
        let outcome = report.outcome(entity).unwrap();
        assert_eq!(outcome.status, EntityStatus::Skipped, "{entity}");
        assert_eq!(outcome.skip_reason, dependency_failed(ISSUES), "{entity}");
    }

    // The target kept everything the successful jobs applied.
    assert_eq!(target.labels().await.len(), 1);
    assert_eq!(target.pull_requests().await.len(), 1);
    assert!(target.issues().await.is_empty());
    assert!(target.comments().await.is_empty());
}

#[tokio::test]
async fn test_conflict_abort_on_labels_skips_the_entire_downstream_graph() {
    let store = snapshot_of(seeded_source().await).await;
    let target = Arc::new(
        InMemoryRepoClient::new().with_labels(vec![Label::new("wontfix", "ffffff")]),
    );
    let context = StrategyContext::new()
        .with_repo_client(target.clone())
        .with_snapshot_store(store)
        .with_conflict_policy(ConflictPolicy::FailIfExisting);
    let registry = builtin_registry().unwrap();

    let report = execute(&registry, &context, OperationKind::Restore)
        .await
        .unwrap();

    assert!(!report.is_success());
    let labels = report.outcome(LABELS).unwrap();
    assert_eq!(labels.status, EntityStatus::Failed);
    assert!(labels
        .error
        .as_deref()
        .unwrap_or("")
        .contains("Found 1 existing item(s)"));

    for entity in [ISSUES, COMMENTS, PULL_REQUESTS, SUB_ISSUES] {
        let outcome = report.outcome(entity).unwrap();
        assert_eq!(outcome.status, EntityStatus::Skipped, "{entity}");
        assert_eq!(outcome.skip_reason, dependency_failed(LABELS), "{entity}");
    }

    // Nothing was written: the policy failed before the first mutation.
    assert_eq!(target.labels().await, vec![Label::new("wontfix", "ffffff")]);
    assert!(target.issues().await.is_empty());
}

#[tokio::test]
async fn test_identical_labels_pass_under_fail_if_conflict() {
    let store = snapshot_of(seeded_source().await).await;
    let target = Arc::new(
        InMemoryRepoClient::new().with_labels(vec![Label::new("bug", "d73a4a")]),
    );
    let context = StrategyContext::new()
        .with_repo_client(target.clone())
        .with_snapshot_store(store)
        .with_conflict_policy(ConflictPolicy::FailIfConflict);
    let registry = builtin_registry().unwrap();

    let report = execute(&registry, &context, OperationKind::Restore)
        .await
        .unwrap();

    assert!(report.is_success());
    let labels = report.outcome(LABELS).unwrap();
    assert_eq!(labels.items, 0);
    assert_eq!(labels.items_dropped, 1);
    assert_eq!(target.labels().await.len(), 1);
}

#[tokio::test]
async fn test_selective_issue_restore_drops_unselected_references() {
    let store = snapshot_of(seeded_source().await).await;
    let target = Arc::new(InMemoryRepoClient::new());
    let context = StrategyContext::new()
        .with_repo_client(target.clone())
        .with_snapshot_store(store)
        .with_conflict_policy(ConflictPolicy::Skip);

    let mut registry = builtin_registry().unwrap();
    let activation: BTreeMap<String, Activation> = [(
        ISSUES.to_string(),
        Activation::Selected(BTreeSet::from([1])),
    )]
    .into_iter()
    .collect();
    registry.load_activation(&activation, true).unwrap();
    registry.validate_dependencies(false).unwrap();

    let report = execute(&registry, &context, OperationKind::Restore)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.outcome(ISSUES).unwrap().items, 1);

    let comments = report.outcome(COMMENTS).unwrap();
    assert_eq!(comments.items, 1);
    assert_eq!(comments.items_dropped, 1);

    let links = report.outcome(SUB_ISSUES).unwrap();
    assert_eq!(links.items, 0);
    assert_eq!(links.items_dropped, 1);

    let issues = target.issues().await;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "Epic");
    assert_eq!(target.comments().await.len(), 1);
    assert!(target.sub_issue_links().await.is_empty());
}

#[tokio::test]
async fn test_disabling_issues_cascades_its_dependents_out_of_the_run() {
    let store = snapshot_of(seeded_source().await).await;
    let target = Arc::new(InMemoryRepoClient::new());
    let context = StrategyContext::new()
        .with_repo_client(target.clone())
        .with_snapshot_store(store)
        .with_conflict_policy(ConflictPolicy::Skip);

    let mut registry = builtin_registry().unwrap();
    let activation: BTreeMap<String, Activation> =
        [(ISSUES.to_string(), Activation::Disabled)].into_iter().collect();
    registry.load_activation(&activation, true).unwrap();
    let auto_disabled = registry.validate_dependencies(false).unwrap();
    assert_eq!(auto_disabled, vec![COMMENTS.to_string(), SUB_ISSUES.to_string()]);

    let report = execute(&registry, &context, OperationKind::Restore)
        .await
        .unwrap();

    assert!(report.is_success());
    let entities: Vec<&str> = report.outcomes.iter().map(|o| o.entity.as_str()).collect();
    assert_eq!(entities, vec![LABELS, PULL_REQUESTS]);
    assert!(target.issues().await.is_empty());
    assert_eq!(target.pull_requests().await.len(), 1);
}

#[tokio::test]
async fn test_missing_conflict_policy_aborts_before_any_job_runs() {
    let store = snapshot_of(seeded_source().await).await;
    let target = Arc::new(InMemoryRepoClient::new());
    let context = StrategyContext::new()
        .with_repo_client(target.clone())
        .with_snapshot_store(store);
    let registry = builtin_registry().unwrap();

    let error = execute(&registry, &context, OperationKind::Restore)
        .await
        .unwrap_err();

    assert!(error
        .to_string()
        .contains("conflict policy required by `labels` for restore"));
    assert!(target.labels().await.is_empty());
    assert!(target.issues().await.is_empty());
}
