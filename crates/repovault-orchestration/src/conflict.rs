//! Conflict resolution between existing repository data and snapshot data

use std::collections::HashMap;
use std::fmt;

use repovault_domain::Label;
use serde::{Deserialize, Serialize};

use crate::error::ConflictError;

/// How a restore treats data already present on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Abort when the target holds any existing items at all
    FailIfExisting,
    /// Abort only when an overlapping identity differs in content
    FailIfConflict,
    /// Delete every existing item, then create everything requested
    DeleteAll,
    /// Update overlapping items to the requested content, create the rest
    Overwrite,
    /// Leave overlapping items untouched, create only the rest
    Skip,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FailIfExisting => "fail-if-existing",
            Self::FailIfConflict => "fail-if-conflict",
            Self::DeleteAll => "delete-all",
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
        };
        write!(f, "{name}")
    }
}

/// Item that can be paired against existing data by a stable identity
pub trait ConflictItem {
    /// Identity used to pair a requested item with an existing one
    fn identity(&self) -> String;

    /// Whether this requested item differs in content from `existing`.
    ///
    /// Only called when both sides share an identity.
    fn conflicts_with(&self, existing: &Self) -> bool;
}

impl ConflictItem for Label {
    fn identity(&self) -> String {
        self.name.clone()
    }

    fn conflicts_with(&self, existing: &Self) -> bool {
        self.color != existing.color || self.description != existing.description
    }
}

/// Mutation plan produced by [`reconcile`]; the caller performs the
/// remote calls, this module never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<T> {
    /// Requested items to create on the target
    pub create: Vec<T>,
    /// Requested items that replace an existing item of the same identity
    pub update: Vec<T>,
    /// Identities of existing items to delete before creating
    pub delete: Vec<String>,
    /// Identities of requested items intentionally left alone
    pub skipped: Vec<String>,
}

impl<T> Default for Reconciliation<T> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Decides how `requested` items reconcile against `existing` ones
/// under the given policy.
///
/// Requested order is preserved in every output list, and the first
/// conflicting pair (in requested order) is the one a failure names.
pub fn reconcile<T: ConflictItem + Clone>(
    policy: ConflictPolicy,
    existing: &[T],
    requested: Vec<T>,
) -> Result<Reconciliation<T>, ConflictError> {
    let mut plan = Reconciliation::default();
    let by_identity: HashMap<String, &T> = existing
        .iter()
        .map(|item| (item.identity(), item))
        .collect();

    match policy {
        ConflictPolicy::FailIfExisting => {
            if !existing.is_empty() {
                return Err(ConflictError::ExistingData {
                    count: existing.len(),
                });
            }
            plan.create = requested;
        }
        ConflictPolicy::FailIfConflict => {
            for item in requested {
                match by_identity.get(&item.identity()) {
                    Some(current) if item.conflicts_with(current) => {
                        return Err(ConflictError::Conflicting {
                            identity: item.identity(),
                        });
                    }
                    Some(_) => plan.skipped.push(item.identity()),
                    None => plan.create.push(item),
                }
            }
        }
        ConflictPolicy::DeleteAll => {
            plan.delete = existing.iter().map(ConflictItem::identity).collect();
            plan.create = requested;
        }
        ConflictPolicy::Overwrite => {
            for item in requested {
                if by_identity.contains_key(&item.identity()) {
                    plan.update.push(item);
                } else {
                    plan.create.push(item);
                }
            }
        }
        ConflictPolicy::Skip => {
            for item in requested {
                if by_identity.contains_key(&item.identity()) {
                    plan.skipped.push(item.identity());
                } else {
                    plan.create.push(item);
                }
            }
        }
    }

    Ok(plan)
}
