//! Save and restore strategies for each built-in entity kind

pub mod comments;
pub mod issues;
pub mod labels;
pub mod pull_requests;
pub mod sub_issues;

pub use comments::{RestoreComments, SaveComments};
pub use issues::{RestoreIssues, SaveIssues};
pub use labels::{RestoreLabels, SaveLabels};
pub use pull_requests::{RestorePullRequests, SavePullRequests};
pub use sub_issues::{RestoreSubIssues, SaveSubIssues};
