//! In-memory collaborators, used by tests and dry runs

use std::collections::HashMap;

use async_trait::async_trait;
use repovault_domain::{Issue, IssueComment, IssueState, Label, PullRequest, SubIssueLink};
use repovault_orchestration::{JobError, JobResult, RepoDataClient, SnapshotStore};
use serde_json::Value;
use tokio::sync::RwLock;

/// Operation an [`InMemoryRepoClient`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Fail every `create_label` call
    CreateLabel,
    /// Fail every `create_issue` call
    CreateIssue,
    /// Fail every `create_comment` call
    CreateComment,
    /// Fail every `create_pull_request` call
    CreatePullRequest,
}

#[derive(Debug)]
struct ClientState {
    labels: Vec<Label>,
    issues: Vec<Issue>,
    comments: Vec<IssueComment>,
    pull_requests: Vec<PullRequest>,
    sub_issues: Vec<SubIssueLink>,
    next_number: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            issues: Vec::new(),
            comments: Vec::new(),
            pull_requests: Vec::new(),
            sub_issues: Vec::new(),
            next_number: 1,
        }
    }
}

/// Repository client backed by process memory.
///
/// Issue and pull request numbers are assigned from one shared
/// sequence, the way GitHub numbers them. Created issues always start
/// open; `close_issue` performs the state transition, mirroring an API
/// that cannot create closed issues directly.
#[derive(Debug, Default)]
pub struct InMemoryRepoClient {
    state: RwLock<ClientState>,
    fault: Option<FaultPoint>,
}

impl InMemoryRepoClient {
    /// Creates an empty client
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named operation fail with an injected error
    pub fn with_fault(mut self, fault: FaultPoint) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Seeds the repository with existing labels
    pub fn with_labels(self, labels: Vec<Label>) -> Self {
        let mut state = self.state.into_inner();
        state.labels = labels;
        Self {
            state: RwLock::new(state),
            fault: self.fault,
        }
    }

    /// Seeds the repository with existing issues; the number sequence
    /// continues after the highest seeded number
    pub fn with_issues(self, issues: Vec<Issue>) -> Self {
        let mut state = self.state.into_inner();
        let highest = issues.iter().map(|issue| issue.number).max().unwrap_or(0);
        state.next_number = state.next_number.max(highest + 1);
        state.issues = issues;
        Self {
            state: RwLock::new(state),
            fault: self.fault,
        }
    }

    /// Current labels, for assertions
    pub async fn labels(&self) -> Vec<Label> {
        self.state.read().await.labels.clone()
    }

    /// Current issues, for assertions
    pub async fn issues(&self) -> Vec<Issue> {
        self.state.read().await.issues.clone()
    }

    /// Current comments, for assertions
    pub async fn comments(&self) -> Vec<IssueComment> {
        self.state.read().await.comments.clone()
    }

    /// Current pull requests, for assertions
    pub async fn pull_requests(&self) -> Vec<PullRequest> {
        self.state.read().await.pull_requests.clone()
    }

    /// Current sub-issue links, for assertions
    pub async fn sub_issue_links(&self) -> Vec<SubIssueLink> {
        self.state.read().await.sub_issues.clone()
    }

    fn check_fault(&self, point: FaultPoint) -> JobResult<()> {
        if self.fault == Some(point) {
            return Err(JobError::api(format!("injected fault at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl RepoDataClient for InMemoryRepoClient {
    async fn list_labels(&self) -> JobResult<Vec<Label>> {
        Ok(self.state.read().await.labels.clone())
    }

    async fn create_label(&self, label: Label) -> JobResult<Label> {
        self.check_fault(FaultPoint::CreateLabel)?;
        let mut state = self.state.write().await;
        if state.labels.iter().any(|l| l.name == label.name) {
            return Err(JobError::api(format!(
                "label `{}` already exists",
                label.name
            )));
        }
        state.labels.push(label.clone());
        Ok(label)
    }

    async fn update_label(&self, label: Label) -> JobResult<Label> {
        let mut state = self.state.write().await;
        match state.labels.iter_mut().find(|l| l.name == label.name) {
            Some(existing) => {
                *existing = label.clone();
                Ok(label)
            }
            None => Err(JobError::api(format!("label `{}` not found", label.name))),
        }
    }

    async fn delete_label(&self, name: &str) -> JobResult<()> {
        let mut state = self.state.write().await;
        let before = state.labels.len();
        state.labels.retain(|l| l.name != name);
        if state.labels.len() == before {
            return Err(JobError::api(format!("label `{name}` not found")));
        }
        Ok(())
    }

    async fn list_issues(&self) -> JobResult<Vec<Issue>> {
        Ok(self.state.read().await.issues.clone())
    }

    async fn create_issue(&self, issue: Issue) -> JobResult<Issue> {
        self.check_fault(FaultPoint::CreateIssue)?;
        let mut state = self.state.write().await;
        let mut created = issue;
        created.number = state.next_number;
        created.state = IssueState::Open;
        state.next_number += 1;
        state.issues.push(created.clone());
        Ok(created)
    }

    async fn close_issue(&self, number: u64) -> JobResult<()> {
        let mut state = self.state.write().await;
        match state.issues.iter_mut().find(|i| i.number == number) {
            Some(issue) => {
                issue.state = IssueState::Closed;
                Ok(())
            }
            None => Err(JobError::api(format!("issue {number} not found"))),
        }
    }

    async fn list_comments(&self) -> JobResult<Vec<IssueComment>> {
        Ok(self.state.read().await.comments.clone())
    }

    async fn create_comment(&self, comment: IssueComment) -> JobResult<IssueComment> {
        self.check_fault(FaultPoint::CreateComment)?;
        let mut state = self.state.write().await;
        if !state.issues.iter().any(|i| i.number == comment.issue_number) {
            return Err(JobError::api(format!(
                "issue {} not found",
                comment.issue_number
            )));
        }
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_pull_requests(&self) -> JobResult<Vec<PullRequest>> {
        Ok(self.state.read().await.pull_requests.clone())
    }

    async fn create_pull_request(&self, pr: PullRequest) -> JobResult<PullRequest> {
        self.check_fault(FaultPoint::CreatePullRequest)?;
        let mut state = self.state.write().await;
        let mut created = pr;
        created.number = state.next_number;
        state.next_number += 1;
        state.pull_requests.push(created.clone());
        Ok(created)
    }

    async fn list_sub_issue_links(&self) -> JobResult<Vec<SubIssueLink>> {
        Ok(self.state.read().await.sub_issues.clone())
    }

    async fn create_sub_issue_link(&self, link: SubIssueLink) -> JobResult<SubIssueLink> {
        let mut state = self.state.write().await;
        for number in [link.parent_number, link.child_number] {
            if !state.issues.iter().any(|i| i.number == number) {
                return Err(JobError::api(format!("issue {number} not found")));
            }
        }
        if state.sub_issues.contains(&link) {
            return Err(JobError::api(format!(
                "issue {} is already linked under {}",
                link.child_number, link.parent_number
            )));
        }
        state.sub_issues.push(link);
        Ok(link)
    }
}

/// Snapshot store backed by process memory, keyed by collection name
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one collection with snapshot items
    pub fn with_collection(self, name: impl Into<String>, items: Vec<Value>) -> Self {
        let mut collections = self.collections.into_inner();
        collections.insert(name.into(), items);
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Items currently held in `collection`, for assertions
    pub async fn items(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn reset(&self, collection: &str) -> JobResult<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn append(&self, collection: &str, item: Value) -> JobResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(item);
        Ok(())
    }

    async fn load_all(&self, collection: &str) -> JobResult<Vec<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_issues_and_pull_requests_share_the_number_sequence() {
        let client = InMemoryRepoClient::new();

        let issue = client
            .create_issue(Issue::new(0, "First", "octocat"))
            .await
            .unwrap();
        let pr = client
            .create_pull_request(PullRequest::new(0, "Fix", "topic", "main"))
            .await
            .unwrap();
        let second = client
            .create_issue(Issue::new(0, "Second", "octocat"))
            .await
            .unwrap();

        assert_eq!(issue.number, 1);
        assert_eq!(pr.number, 2);
        assert_eq!(second.number, 3);
    }

    #[tokio::test]
    async fn test_created_issues_start_open_until_closed() {
        let client = InMemoryRepoClient::new();
        let mut requested = Issue::new(0, "Done already", "octocat");
        requested.state = IssueState::Closed;

        let created = client.create_issue(requested).await.unwrap();
        assert_eq!(created.state, IssueState::Open);

        client.close_issue(created.number).await.unwrap();
        assert_eq!(client.issues().await[0].state, IssueState::Closed);

        let error = client.close_issue(99).await.unwrap_err();
        assert!(error.to_string().contains("99"));
    }

    #[tokio::test]
    async fn test_duplicate_label_creation_is_rejected() {
        let client = InMemoryRepoClient::new().with_labels(vec![Label::new("bug", "d73a4a")]);

        let error = client
            .create_label(Label::new("bug", "ffffff"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("already exists"));

        client
            .update_label(Label::new("bug", "ffffff"))
            .await
            .unwrap();
        assert_eq!(client.labels().await[0].color, "ffffff");
    }

    #[tokio::test]
    async fn test_comments_require_an_existing_issue() {
        let client = InMemoryRepoClient::new();

        let error = client
            .create_comment(IssueComment::new(1, "hello", "octocat"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("issue 1 not found"));
    }

    #[tokio::test]
    async fn test_sub_issue_links_validate_both_ends() {
        let client = InMemoryRepoClient::new();
        let parent = client
            .create_issue(Issue::new(0, "Parent", "octocat"))
            .await
            .unwrap();
        let child = client
            .create_issue(Issue::new(0, "Child", "octocat"))
            .await
            .unwrap();

        let link = SubIssueLink::new(parent.number, child.number);
        client.create_sub_issue_link(link).await.unwrap();

        let error = client.create_sub_issue_link(link).await.unwrap_err();
        assert!(error.to_string().contains("already linked"));

        let error = client
            .create_sub_issue_link(SubIssueLink::new(parent.number, 42))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("42 not found"));
    }

    #[tokio::test]
    async fn test_fault_injection_fails_the_selected_operation_only() {
        let client = InMemoryRepoClient::new().with_fault(FaultPoint::CreateIssue);

        client.create_label(Label::new("bug", "d73a4a")).await.unwrap();
        let error = client
            .create_issue(Issue::new(0, "First", "octocat"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("injected fault"));
    }

    #[tokio::test]
    async fn test_store_preserves_append_order_and_resets() {
        let store = InMemorySnapshotStore::new();

        store.append("labels", json!({"name": "bug"})).await.unwrap();
        store.append("labels", json!({"name": "docs"})).await.unwrap();

        let items = store.load_all("labels").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "bug");

        store.reset("labels").await.unwrap();
        assert!(store.load_all("labels").await.unwrap().is_empty());
        assert!(store.load_all("missing").await.unwrap().is_empty());
    }
}
