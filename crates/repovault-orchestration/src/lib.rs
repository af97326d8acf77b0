//! Dependency-aware save/restore orchestration for RepoVault
//!
//! This crate decides which repository data entities take part in a
//! run, in what order their jobs must execute, and drives them with
//! bounded parallelism while isolating partial failures:
//! - Entity registry with activation loading and dependency validation
//! - Deterministic topological planning with cycle detection
//! - Up-front service validation before any strategy is constructed
//! - A job orchestrator that gates dependents on their dependencies
//!   and aggregates every outcome into a single report
//! - Pure conflict-resolution policies for restores
//!
//! Entity internals stay out of this crate: entities plug in through
//! [`EntityDescriptor`] and [`EntityStrategy`], and reach external
//! systems only through the service traits in [`services`].

pub mod conflict;
pub mod context;
pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod run;
pub mod services;
pub mod shared;
pub mod strategy;

pub use conflict::{reconcile, ConflictItem, ConflictPolicy, Reconciliation};
pub use context::{ServiceKind, StrategyContext};
pub use error::{ConflictError, JobError, JobResult, OrchestrationError, Result, ServiceMiss};
pub use factory::{PreparedJob, StrategyFactory};
pub use orchestrator::{JobOrchestrator, JobState, OrchestratorConfig};
pub use registry::{
    no_strategy, topological_sort, transitive_dependents, Activation, EntityDescriptor,
    EntityRegistry, StrategyFactoryFn,
};
pub use report::{EntityOutcome, EntityStatus, RunReport, SkipReason};
pub use run::{execute, execute_with_config};
pub use services::{RepoDataClient, SnapshotStore};
pub use shared::{IdMap, SharedRunContext};
pub use strategy::{EntityStrategy, OperationKind};
