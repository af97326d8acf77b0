//! Label save and restore strategies.
//!
//! Labels are the only entity restored through conflict reconciliation:
//! they are keyed by name rather than by an assigned number, so existing
//! labels on the target can genuinely collide with snapshot labels. The
//! restore strategy turns the reconciliation plan into a list of action
//! items and applies them one by one, deletions first.

use std::sync::Arc;

use async_trait::async_trait;
use repovault_domain::Label;
use repovault_orchestration::{
    reconcile, ConflictPolicy, EntityStrategy, JobResult, RepoDataClient, SharedRunContext,
    SnapshotStore, StrategyContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::LABELS;

/// One step of a label restore, in application order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum LabelAction {
    /// Delete an existing label from the target
    Delete { name: String },
    /// Replace the content of an existing label
    Update { label: Label },
    /// Create a label that does not exist on the target
    Create { label: Label },
    /// Leave an overlapping label untouched
    Skip { name: String },
}

/// Captures repository labels into the snapshot
pub struct SaveLabels {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
}

impl SaveLabels {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for SaveLabels {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let mut labels = self.client.list_labels().await?;
        labels.sort_by(|a, b| a.name.cmp(&b.name));

        self.store.reset(LABELS).await?;
        labels
            .into_iter()
            .map(|label| serde_json::to_value(label).map_err(Into::into))
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
        self.store.append(LABELS, item.clone()).await?;
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}

/// Applies snapshot labels onto the repository under a conflict policy
pub struct RestoreLabels {
    client: Arc<dyn RepoDataClient>,
    store: Arc<dyn SnapshotStore>,
    policy: ConflictPolicy,
}

impl RestoreLabels {
    /// Builds the strategy from run services
    pub fn from_context(context: &StrategyContext) -> repovault_orchestration::Result<Self> {
        Ok(Self {
            client: context.repo_client()?,
            store: context.snapshot_store()?,
            policy: context.conflict_policy()?,
        })
    }
}

#[async_trait]
impl EntityStrategy for RestoreLabels {
    async fn load(&mut self) -> JobResult<Vec<Value>> {
        let existing = self.client.list_labels().await?;
        let requested = self
            .store
            .load_all(LABELS)
            .await?
            .into_iter()
            .map(serde_json::from_value::<Label>)
            .collect::<Result<Vec<_>, _>>()?;

        // Reconciliation runs before any write reaches the target, so a
        // failing policy aborts the job with the repository untouched.
        let plan = reconcile(self.policy, &existing, requested)?;
        debug!(
            policy = %self.policy,
            create = plan.create.len(),
            update = plan.update.len(),
            delete = plan.delete.len(),
            skipped = plan.skipped.len(),
            "Reconciled labels"
        );

        let mut actions = Vec::new();
        for name in plan.delete {
            actions.push(LabelAction::Delete { name });
        }
        for label in plan.update {
            actions.push(LabelAction::Update { label });
        }
        for label in plan.create {
            actions.push(LabelAction::Create { label });
        }
        for name in plan.skipped {
            actions.push(LabelAction::Skip { name });
        }

        actions
            .into_iter()
            .map(|action| serde_json::to_value(action).map_err(Into::into))
            .collect()
    }

    async fn transform(
        &mut self,
        item: Value,
        _shared: &SharedRunContext,
    ) -> JobResult<Option<Value>> {
        let action: LabelAction = serde_json::from_value(item.clone())?;
        if let LabelAction::Skip { name } = action {
            debug!(label = %name, "Label left untouched by policy");
            return Ok(None);
        }
        Ok(Some(item))
    }

    async fn create(&mut self, item: Value) -> JobResult<Value> {
        let action: LabelAction = serde_json::from_value(item.clone())?;
        match action {
            LabelAction::Delete { name } => {
                self.client.delete_label(&name).await?;
            }
            LabelAction::Update { label } => {
                self.client.update_label(label).await?;
            }
            LabelAction::Create { label } => {
                self.client.create_label(label).await?;
            }
            LabelAction::Skip { .. } => {}
        }
        Ok(item)
    }

    async fn after_create(&mut self, _created: Value, _shared: &SharedRunContext) -> JobResult<()> {
        Ok(())
    }
}
