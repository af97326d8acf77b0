//! Strategy contract implemented by every entity save/restore handler

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JobResult;
use crate::shared::SharedRunContext;

/// Direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Capture repository data into a snapshot
    Save,
    /// Apply snapshot data back onto a repository
    Restore,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Per-entity handler driven by the orchestrator.
///
/// A strategy moves one entity kind in one direction. The orchestrator
/// drives it item by item: `load` produces the work list, then each item
/// flows through `transform`, `create`, and `after_create`. Items are
/// JSON values so the driver stays agnostic of entity shapes; strategies
/// deserialize at the edges.
///
/// The first error from any step fails the whole job. Transforms may
/// drop an item by returning `Ok(None)`; dropped items are counted but
/// do not fail the job.
#[async_trait]
pub trait EntityStrategy: Send + Sync {
    /// Produces the full list of items this job will process
    async fn load(&mut self) -> JobResult<Vec<Value>>;

    /// Rewrites one item before creation, consulting cross-entity state.
    ///
    /// Returns `Ok(None)` to drop the item from the run.
    async fn transform(&mut self, item: Value, shared: &SharedRunContext)
        -> JobResult<Option<Value>>;

    /// Applies one item to the target, returning the resulting record
    async fn create(&mut self, item: Value) -> JobResult<Value>;

    /// Records side effects of a creation, such as identifier mappings
    async fn after_create(&mut self, created: Value, shared: &SharedRunContext) -> JobResult<()>;
}
