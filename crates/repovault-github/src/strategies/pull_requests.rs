//! Pull request save and restore strategies.
//!
//! Restored pull requests, like issues, receive fresh numbers from the
//! target; the mapping is recorded in the shared run context. Branch
//! contents are out of scope here: a restored pull request points at
//! whatever `head` and `base` branches the target currently has.

use std::sync::Arc;

use async_trait::async_trait;
use repovault_domain::PullRequest;
use repovault_orchestration::{
    Activation, EntityStrategy, JobResult, RepoDataClient, SharedRunContext, SnapshotStore,
    StrategyContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::PULL_REQUESTS;
use crate::strategies::issues::provenance_note;

/// Pull request as applied to the target, paired with its source number
#[derive(Debug, Serialize, Deserialize)]
struct CreatedPullRequest {
    original_number: u64,
    created: PullRequest,
}

/// Captures repository pull requests into the snapshot
pub struct SavePullRequests {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
}

impl SavePullRequests {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for SavePullRequests {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut prs = self.client.list_pull_requests().await?;
        prs.sort_by_key(|pr| pr.number);

        self.store.reset(PULL_REQUESTS).await?;
        prs.into_iter()
            .map(|pr| serde_json::to_value(pr).map_err(Into::into))
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
        self.store.append(PULL_REQUESTS, item.clone()).await?;
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}

/// Recreates snapshot pull requests on the repository
pub struct RestorePullRequests {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
    activation: Activation,
    preserve_metadata: bool,
}

impl RestorePullRequests {
    /// Builds the strategy from run services and configuration
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
            activation: context.activation_for(PULL_REQUESTS),
            preserve_metadata: context.preserve_metadata(),
        })
    }
}

#[async_trait]
impl EntityStrategy for RestorePullRequests {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut prs = self
            .store
            .load_all(PULL_REQUESTS)
            .await?
            .into_iter()
            .map(serde_json::from_value::<PullRequest>)
            .collect::<Result<Vec<_>, _>>()?;

        prs.retain(|pr| self.activation.selects(pr.number));
        prs.sort_by_key(|pr| pr.number);
        debug!(pull_request_count = prs.len(), "Selected snapshot pull requests");

        prs.into_iter()
            .map(|pr| serde_json::to_value(pr).map_err(Into::into))
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

        let mut pr: PullRequest = serde_json::from_value(item)?;
        pr.body = provenance_note(&pr.body, &pr.author, pr.created_at);
        Ok(Some(serde_json::to_value(pr)?))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        let pr: PullRequest = serde_json::from_value(item)?;
        let original_number = pr.number;

        let created = self.client.create_pull_request(pr).await?;
        Ok(serde_json::to_value(CreatedPullRequest {
            original_number,
            created,
        })?)
    }

    async fn after_create(&mut self, created: Value, shared: &SharedRunContext) -> JobResult<()> {
        let record: CreatedPullRequest = serde_json::from_value(created)?;
        shared
            .pull_requests
            .record(record.original_number, record.created.number)
            .await;
        Ok(())
    }
}
