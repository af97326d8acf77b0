//! Issue save and restore strategies.
//!
//! Restored issues receive fresh numbers from the target, so the
//! restore records an original-to-assigned mapping in the shared run
//! context for comments and sub-issue links to consume. Closed issues
//! are recreated open and then closed, matching an API that cannot
//! create a closed issue directly.

use std::sync::Arc;

use async_trait::async_trait;
use repovault_domain::{Issue, IssueState};
use repovault_orchestration::{
    Activation, EntityStrategy, JobResult, RepoDataClient, SharedRunContext, SnapshotStore,
    StrategyContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::ISSUES;

/// Issue as applied to the target, still paired with its source number
#[derive(Debug, Serialize, Deserialize)]
struct CreatedIssue {
    original_number: u64,
    created: Issue,
}

/// Prefixes a body with a note naming the original author and date
pub(crate) fn provenance_note(body: &str, author: &str, created_at: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "*Originally created by @{} on {}*\n\n{}",
        author,
        created_at.format("%Y-%m-%d"),
        body
    )
}

/// Captures repository issues into the snapshot
pub struct SaveIssues {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
}

impl SaveIssues {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for SaveIssues {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut issues = self.client.list_issues().await?;
        issues.sort_by_key(|issue| issue.number);

        self.store.reset(ISSUES).await?;
        issues
            .into_iter()
            .map(|issue| serde_json::to_value(issue).map_err(Into::into))
            .collect()
    }

    async fn transform(
        &mut self,
        item: Value,
        _shared: &SharedRunContext,
    ) -> JobResult<Option<Value>> {
        Ok(Some(item))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        self.store.append(ISSUES, item.clone()).await?;
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}

/// Recreates snapshot issues on the repository
pub struct RestoreIssues {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
    activation: Activation,
    preserve_metadata: bool,
}

impl RestoreIssues {
    /// Builds the strategy from run services and configuration
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
            activation: context.activation_for(ISSUES),
            preserve_metadata: context.preserve_metadata(),
        })
    }
}

#[async_trait]
impl EntityStrategy for RestoreIssues {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut issues = self
            .store
            .load_all(ISSUES)
            .await?
            .into_iter()
            .map(serde_json::from_value::<Issue>)
            .collect::<Result<Vec<_>, _>>()?;

        issues.retain(|issue| self.activation.selects(issue.number));
        issues.sort_by_key(|issue| issue.number);
        debug!(issue_count = issues.len(), "Selected snapshot issues");

        issues
            .into_iter()
            .map(|issue| serde_json::to_value(issue).map_err(Into::into))
            .collect()
    }

    async fn transform(
        &mut self,
        item: Value,
        _shared: &SharedRunContext,
    ) -> JobResult<Option<Value>> {
        if !self.preserve_metadata {
            return Ok(Some(item));
        }

        let mut issue: Issue = serde_json::from_value(item)?;
        issue.body = provenance_note(&issue.body, &issue.author, issue.created_at);
        Ok(Some(serde_json::to_value(issue)?))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        let issue: Issue = serde_json::from_value(item)?;
        let original_number = issue.number;
        let desired_state = issue.state;

        let mut created = self.client.create_issue(issue).await?;
        if desired_state == IssueState::Closed {
            self.client.close_issue(created.number).await?;
            created.state = IssueState::Closed;
        }

        Ok(serde_json::to_value(CreatedIssue {
            original_number,
            created,
        })?)
    }

    async fn after_create(&mut self, created: Value, shared: &SharedRunContext) -> JobResult<()> {
        let record: CreatedIssue = serde_json::from_value(created)?;
        shared
            .issues
            .record(record.original_number, record.created.number)
            .await;
        Ok(())
    }
}
