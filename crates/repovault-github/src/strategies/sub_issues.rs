//! Sub-issue hierarchy save and restore strategies.
//!
//! Links reference issues on both ends, so a restored link is only
//! valid when both its parent and child were restored in this run.
//! Links with a missing end are dropped rather than failing the job:
//! a selective issue restore legitimately leaves holes in the
//! hierarchy.

use std::sync::Arc;

use async_trait::async_trait;
use repovault_domain::SubIssueLink;
use repovault_orchestration::{
    EntityStrategy, JobResult, RepoDataClient, SharedRunContext, SnapshotStore, StrategyContext,
};
use serde_json::Value;
use tracing::warn;

use crate::catalog::SUB_ISSUES;

/// Captures parent/child issue links into the snapshot
pub struct SaveSubIssues {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
}

impl SaveSubIssues {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for SaveSubIssues {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut links = self.client.list_sub_issue_links().await?;
        links.sort_by_key(|link| (link.parent_number, link.child_number));

        self.store.reset(SUB_ISSUES).await?;
        links
            .into_iter()
            .map(|link| serde_json::to_value(link).map_err(Into::into))
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
        self.store.append(SUB_ISSUES, item.clone()).await?;
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}

/// Relinks restored issues into their snapshot hierarchy
pub struct RestoreSubIssues {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
}

impl RestoreSubIssues {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for RestoreSubIssues {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut links = self
            .store
            .load_all(SUB_ISSUES)
            .await?
            .into_iter()
            .map(serde_json::from_value::<SubIssueLink>)
            .collect::<Result<Vec<_>, _>>()?;

        links.sort_by_key(|link| (link.parent_number, link.child_number));

        links
            .into_iter()
            .map(|link| serde_json::to_value(link).map_err(Into::into))
            .collect()
    }

    async fn transform(
        &mut self,
        item: Value,
        shared: &SharedRunContext,
    ) -> JobResult<Option<Value>> {
        let link: SubIssueLink = serde_json::from_value(item)?;

        let parent = shared.issues.lookup(link.parent_number).await;
        let child = shared.issues.lookup(link.child_number).await;
        let (Some(parent), Some(child)) = (parent, child) else {
            warn!(
                parent = link.parent_number,
                child = link.child_number,
                "Dropping sub-issue link with an unrestored end"
            );
            return Ok(None);
        };

        Ok(Some(serde_json::to_value(SubIssueLink::new(parent, child))?))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        let link: SubIssueLink = serde_json::from_value(item)?;
        let created = self.client.create_sub_issue_link(link).await?;
        Ok(serde_json::to_value(created)?)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}
