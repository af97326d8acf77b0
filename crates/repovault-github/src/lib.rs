//! GitHub entity strategies for RepoVault.
//!
//! Plugs the built-in entity kinds into the orchestration layer: a
//! catalog of descriptors (labels, issues, comments, pull requests,
//! sub-issue links), the save and restore strategy for each, and
//! in-memory service implementations for tests and dry runs.

pub mod catalog;
pub mod memory;
pub mod strategies;

pub use catalog::{
    builtin_descriptors, builtin_registry, COMMENTS, ISSUES, LABELS, PULL_REQUESTS, SUB_ISSUES,
};
pub use memory::{FaultPoint, InMemoryRepoClient, InMemorySnapshotStore};
pub use strategies::{
    RestoreComments, RestoreIssues, RestoreLabels, RestorePullRequests, RestoreSubIssues,
    SaveComments, SaveIssues, SaveLabels, SavePullRequests, SaveSubIssues,
};
