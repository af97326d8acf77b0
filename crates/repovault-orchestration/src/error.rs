//! Error types for the orchestration framework

use std::fmt;

use thiserror::Error;

use crate::context::ServiceKind;
use crate::strategy::OperationKind;

/// A single unsatisfied service requirement, discovered while
/// validating an execution plan against a [`StrategyContext`].
///
/// [`StrategyContext`]: crate::context::StrategyContext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMiss {
    /// Entity whose requirement is unmet
    pub entity: String,
    /// Operation the entity was being prepared for
    pub operation: OperationKind,
    /// Service that was required but not provided
    pub service: ServiceKind,
}

impl fmt::Display for ServiceMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} required by `{}` for {}",
            self.service, self.entity, self.operation
        )
    }
}

fn join_misses(misses: &[ServiceMiss]) -> String {
    misses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fatal errors raised before or outside job execution
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    /// Invalid registry or activation configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A context accessor was called for a service the context does not hold
    #[error("{0} required but not provided")]
    ServiceNotProvided(ServiceKind),

    /// One or more entities require services the context does not provide
    #[error("Missing required services: {}", join_misses(.0))]
    MissingServices(Vec<ServiceMiss>),

    /// The dependency graph contains a cycle
    #[error("Dependency cycle detected among entities: {}", .members.join(", "))]
    Cycle {
        /// Entities participating in (or downstream of) the cycle
        members: Vec<String>,
    },

    /// A strategy factory failed while building a strategy
    #[error("Failed to construct {operation} strategy for `{entity}`: {reason}")]
    Construction {
        /// Entity whose factory failed
        entity: String,
        /// Operation the strategy was being built for
        operation: OperationKind,
        /// Underlying failure reported by the factory
        reason: String,
    },

    /// The scheduler reached a state it cannot make progress from
    #[error("Internal scheduling error: {0}")]
    Internal(String),
}

impl OrchestrationError {
    /// Create a new Configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Create a new ServiceNotProvided error
    pub fn service_not_provided(service: ServiceKind) -> Self {
        Self::ServiceNotProvided(service)
    }

    /// Create a new MissingServices error
    pub fn missing_services(misses: Vec<ServiceMiss>) -> Self {
        Self::MissingServices(misses)
    }

    /// Create a new Cycle error; members are sorted for stable messages
    pub fn cycle(mut members: Vec<String>) -> Self {
        members.sort();
        Self::Cycle { members }
    }

    /// Create a new Construction error
    pub fn construction(
        entity: impl Into<String>,
        operation: OperationKind,
        reason: impl Into<String>,
    ) -> Self {
        Self::Construction {
            entity: entity.into(),
            operation,
            reason: reason.into(),
        }
    }

    /// Create a new Internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

/// Errors raised by conflict resolution between existing and requested data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// The target already holds data and the policy requires a clean slate
    #[error("Found {count} existing item(s); the policy requires an empty target")]
    ExistingData {
        /// Number of existing items found
        count: usize,
    },

    /// An existing item and a requested item share identity but differ
    #[error("Existing item `{identity}` conflicts with the requested state")]
    Conflicting {
        /// Identity shared by the clashing pair
        identity: String,
    },
}

/// Errors raised by a single entity job; these never abort the whole run
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// Repository API call failed
    #[error("Repository API error: {0}")]
    Api(String),

    /// Snapshot store access failed
    #[error("Snapshot store error: {0}")]
    Store(String),

    /// Conflict resolution rejected the job
    #[error("Conflict resolution failed: {0}")]
    Conflict(#[from] ConflictError),

    /// A snapshot item could not be interpreted
    #[error("Data error: {0}")]
    Data(String),
}

impl JobError {
    /// Create a new Api error
    pub fn api(reason: impl Into<String>) -> Self {
        Self::Api(reason.into())
    }

    /// Create a new Store error
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store(reason.into())
    }

    /// Create a new Data error
    pub fn data(reason: impl Into<String>) -> Self {
        Self::Data(reason.into())
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        Self::Data(err.to_string())
    }
}

/// Result type for run-level orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Result type for per-entity job steps
pub type JobResult<T> = std::result::Result<T, JobError>;
