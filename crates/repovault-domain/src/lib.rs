//! Repository data records for RepoVault
//!
//! This crate defines the plain data types that RepoVault saves and
//! restores: labels, issues, issue comments, pull requests, and the
//! links that form sub-issue hierarchies. The types carry no behavior
//! beyond construction helpers; every workflow concern lives in
//! `repovault-orchestration`.

pub mod models;

pub use models::{
    Issue, IssueComment, IssueState, Label, PullRequest, PullRequestState, SubIssueLink,
};
