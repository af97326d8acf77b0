//! Service traits strategies use to reach the repository and the snapshot

use async_trait::async_trait;
use repovault_domain::{Issue, IssueComment, Label, PullRequest, SubIssueLink};
use serde_json::Value;

use crate::error::JobResult;

/// Client for reading and mutating repository data entities.
///
/// Implementations wrap a hosting provider's API. The orchestration
/// layer never talks to a provider directly; strategies receive an
/// implementation through their [`StrategyContext`].
///
/// [`StrategyContext`]: crate::context::StrategyContext
#[async_trait]
pub trait RepoDataClient: Send + Sync {
    /// Lists all labels defined on the repository
    async fn list_labels(&self) -> JobResult<Vec<Label>>;

    /// Creates a label
    async fn create_label(&self, label: Label) -> JobResult<Label>;

    /// Replaces the color and description of an existing label
    async fn update_label(&self, label: Label) -> JobResult<Label>;

    /// Deletes a label by name
    async fn delete_label(&self, name: &str) -> JobResult<()>;

    /// Lists all issues, open and closed
    async fn list_issues(&self) -> JobResult<Vec<Issue>>;

    /// Creates an issue; the returned record carries the assigned number
    async fn create_issue(&self, issue: Issue) -> JobResult<Issue>;

    /// Closes an issue by number
    async fn close_issue(&self, number: u64) -> JobResult<()>;

    /// Lists all issue comments across the repository
    async fn list_comments(&self) -> JobResult<Vec<IssueComment>>;

    /// Creates a comment on an existing issue
    async fn create_comment(&self, comment: IssueComment) -> JobResult<IssueComment>;

    /// Lists all pull requests
    async fn list_pull_requests(&self) -> JobResult<Vec<PullRequest>>;

    /// Creates a pull request; the returned record carries the assigned number
    async fn create_pull_request(&self, pr: PullRequest) -> JobResult<PullRequest>;

    /// Lists all parent/child sub-issue links
    async fn list_sub_issue_links(&self) -> JobResult<Vec<SubIssueLink>>;

    /// Links a child issue under a parent issue
    async fn create_sub_issue_link(&self, link: SubIssueLink) -> JobResult<SubIssueLink>;
}

/// Storage for snapshot data, keyed by entity collection name.
///
/// Items are stored as JSON values in insertion order. `load_all`
/// returns them in the same order `append` wrote them, which restore
/// strategies rely on for chronologically sorted collections.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Drops all items previously written to `collection`
    async fn reset(&self, collection: &str) -> JobResult<()>;

    /// Appends one item to `collection`
    async fn append(&self, collection: &str, item: Value) -> JobResult<()>;

    /// Returns every item in `collection`, oldest first
    async fn load_all(&self, collection: &str) -> JobResult<Vec<Value>>;
}
