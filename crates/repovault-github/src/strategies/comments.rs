//! Issue comment save and restore strategies.
//!
//! Comments only make sense attached to an issue that exists on the
//! target, so the restore remaps each comment's issue number through
//! the mapping recorded by the issues job and drops comments whose
//! issue was not restored.

use std::sync::Arc;

use async_trait::async_trait;
use repovault_domain::IssueComment;
use repovault_orchestration::{
    EntityStrategy, JobResult, RepoDataClient, SharedRunContext, SnapshotStore, StrategyContext,
};
use serde_json::Value;
use tracing::warn;

use crate::catalog::COMMENTS;
use crate::strategies::issues::provenance_note;

/// Captures issue comments into the snapshot
pub struct SaveComments {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
}

impl SaveComments {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for SaveComments {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut comments = self.client.list_comments().await?;
        comments.sort_by(|a, b| {
            (a.issue_number, a.created_at).cmp(&(b.issue_number, b.created_at))
        });

        self.store.reset(COMMENTS).await?;
        comments
            .into_iter()
            .map(|comment| serde_json::to_value(comment).map_err(Into::into))
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
        self.store.append(COMMENTS, item.clone()).await?;
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}

/// Recreates snapshot comments on their restored issues
pub struct RestoreComments {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
    preserve_metadata: bool,
}

impl RestoreComments {
    /// Builds the strategy from run services and configuration
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
            preserve_metadata: context.preserve_metadata(),
        })
    }
}

#[async_trait]
impl EntityStrategy for RestoreComments {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut comments = self
            .store
            .load_all(COMMENTS)
            .await?
            .into_iter()
            .map(serde_json::from_value::<IssueComment>)
            .collect::<Result<Vec<_>, _>>()?;

        // Chronological order keeps conversations readable on the target.
        comments.sort_by_key(|comment| comment.created_at);

        comments
            .into_iter()
            .map(|comment| serde_json::to_value(comment).map_err(Into::into))
            .collect()
    }

    async fn transform(
        &mut self,
        item: Value,
        shared: &SharedRunContext,
    ) -> JobResult<Option<Value>> {
        let mut comment: IssueComment = serde_json::from_value(item)?;

        let Some(assigned) = shared.issues.lookup(comment.issue_number).await else {
            warn!(
                issue = comment.issue_number,
                "Dropping comment whose issue was not restored"
            );
            return Ok(None);
        };

        comment.issue_number = assigned;
        if self.preserve_metadata {
            comment.body = provenance_note(&comment.body, &comment.author, comment.created_at);
        }
        Ok(Some(serde_json::to_value(comment)?))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        let comment: IssueComment = serde_json::from_value(item)?;
        let created = self.client.create_comment(comment).await?;
        Ok(serde_json::to_value(created)?)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}
