//! Repository entity data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Open issue
    Open,
    /// Closed issue
    Closed,
}

/// Pull request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    /// Draft PR
    Draft,
    /// Open PR
    Open,
    /// Merged PR
    Merged,
    /// Closed PR
    Closed,
}

/// Repository label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name, unique within a repository
    pub name: String,
    /// Hex color without the leading `#`
    pub color: String,
    /// Optional label description
    pub description: Option<String>,
}

impl Label {
    /// Creates a label with no description
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            description: None,
        }
    }

    /// Sets the label description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number within the repository
    pub number: u64,
    /// Issue title
    pub title: String,
    /// Issue body/description
    pub body: String,
    /// Issue state
    pub state: IssueState,
    /// Names of labels attached to the issue
    pub labels: Vec<String>,
    /// Login of the issue author
    pub author: String,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl Issue {
    /// Creates an open, unlabeled issue
    pub fn new(number: u64, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: String::new(),
            state: IssueState::Open,
            labels: Vec::new(),
            author: author.into(),
            created_at: Utc::now(),
        }
    }

    /// Sets the issue body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches a label by name
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

/// Comment on an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    /// Number of the issue the comment belongs to
    pub issue_number: u64,
    /// Comment body
    pub body: String,
    /// Login of the comment author
    pub author: String,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl IssueComment {
    /// Creates a comment on the given issue
    pub fn new(issue_number: u64, body: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            issue_number,
            body: body.into(),
            author: author.into(),
            created_at: Utc::now(),
        }
    }
}

/// Pull request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number within the repository
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: String,
    /// PR state
    pub state: PullRequestState,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// Names of labels attached to the PR
    pub labels: Vec<String>,
    /// Login of the PR author
    pub author: String,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl PullRequest {
    /// Creates an open PR from `head` into `base`
    pub fn new(
        number: u64,
        title: impl Into<String>,
        head: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        Self {
            number,
            title: title.into(),
            body: String::new(),
            state: PullRequestState::Open,
            head: head.into(),
            base: base.into(),
            labels: Vec::new(),
            author: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Parent/child link in a sub-issue hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIssueLink {
    /// Number of the parent issue
    pub parent_number: u64,
    /// Number of the child issue
    pub child_number: u64,
}

impl SubIssueLink {
    /// Creates a link from parent to child
    pub fn new(parent_number: u64, child_number: u64) -> Self {
        Self {
            parent_number,
            child_number,
        }
    }
}
