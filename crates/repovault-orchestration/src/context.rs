//! Typed, validated service container handed to strategy factories

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::conflict::ConflictPolicy;
use crate::error::{OrchestrationError, Result};
use crate::registry::Activation;
use crate::services::{RepoDataClient, SnapshotStore};

/// Identifier for each optional service a context can carry.
///
/// Descriptors list these to declare what their strategies need, and
/// the factory checks the list against the context before building
/// anything. Adding a service means adding a variant, a field, and an
/// accessor; entities that do not use it are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Client for the repository hosting API
    RepoClient,
    /// Snapshot storage backend
    SnapshotStore,
    /// Conflict resolution policy for restores
    ConflictPolicy,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RepoClient => "repository client",
            Self::SnapshotStore => "snapshot store",
            Self::ConflictPolicy => "conflict policy",
        };
        write!(f, "{name}")
    }
}

/// Immutable per-run snapshot of services and configuration.
///
/// Built once per save or restore invocation. Service accessors fail
/// with a uniform "required but not provided" error when the service is
/// absent; plain configuration values carry defaults and never fail.
#[derive(Clone)]
pub struct StrategyContext {
    repo_client: Option<Arc<dyn RepoDataClient>>,
    snapshot_store: Option<Arc<dyn SnapshotStore>>,
    conflict_policy: Option<ConflictPolicy>,
    preserve_metadata: bool,
    activation: BTreeMap<String, Activation>,
}

impl Default for StrategyContext {
    fn default() -> Self {
        Self {
            repo_client: None,
            snapshot_store: None,
            conflict_policy: None,
            preserve_metadata: true,
            activation: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for StrategyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyContext")
            .field("repo_client", &self.repo_client.is_some())
            .field("snapshot_store", &self.snapshot_store.is_some())
            .field("conflict_policy", &self.conflict_policy)
            .field("preserve_metadata", &self.preserve_metadata)
            .field("activation", &self.activation)
            .finish()
    }
}

impl StrategyContext {
    /// Creates a context with no services and default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the repository client
    pub fn with_repo_client(mut self, client: Arc<dyn RepoDataClient>) -> Self {
        self.repo_client = Some(client);
        self
    }

    /// Attaches the snapshot store
    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshot_store = Some(store);
        self
    }

    /// Attaches the conflict policy
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = Some(policy);
        self
    }

    /// Sets whether restores annotate recreated items with their
    /// original author and timestamp (defaults to true)
    pub fn with_preserve_metadata(mut self, preserve: bool) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    /// Embeds the per-entity activation snapshot
    pub fn with_activation(mut self, activation: BTreeMap<String, Activation>) -> Self {
        self.activation = activation;
        self
    }

    /// The repository client, or an error if none was provided
    pub fn repo_client(&self) -> Result<Arc<dyn RepoDataClient>> {
        self.repo_client
            .clone()
            .ok_or(OrchestrationError::ServiceNotProvided(
                ServiceKind::RepoClient,
            ))
    }

    /// The snapshot store, or an error if none was provided
    pub fn snapshot_store(&self) -> Result<Arc<dyn SnapshotStore>> {
        self.snapshot_store
            .clone()
            .ok_or(OrchestrationError::ServiceNotProvided(
                ServiceKind::SnapshotStore,
            ))
    }

    /// The conflict policy, or an error if none was provided
    pub fn conflict_policy(&self) -> Result<ConflictPolicy> {
        self.conflict_policy
            .ok_or(OrchestrationError::ServiceNotProvided(
                ServiceKind::ConflictPolicy,
            ))
    }

    /// Whether the given service is present
    pub fn provides(&self, service: ServiceKind) -> bool {
        match service {
            ServiceKind::RepoClient => self.repo_client.is_some(),
            ServiceKind::SnapshotStore => self.snapshot_store.is_some(),
            ServiceKind::ConflictPolicy => self.conflict_policy.is_some(),
        }
    }

    /// Whether restores annotate recreated items with provenance notes
    pub fn preserve_metadata(&self) -> bool {
        self.preserve_metadata
    }

    /// Activation for the named entity; entities absent from the
    /// snapshot are treated as fully enabled
    pub fn activation_for(&self, entity: &str) -> Activation {
        self.activation
            .get(entity)
            .cloned()
            .unwrap_or(Activation::Enabled)
    }
}
