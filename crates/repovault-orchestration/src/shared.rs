//! Cross-entity state shared by every job in a run

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Concurrent map from original identifiers to their newly assigned ones.
///
/// Restores cannot reuse source numbering: the target assigns fresh
/// numbers on creation. Strategies record each assignment here so that
/// downstream entities can remap references to their parents.
#[derive(Debug, Default)]
pub struct IdMap {
    inner: RwLock<HashMap<u64, u64>>,
}

impl IdMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `original` was recreated as `assigned`
    pub async fn record(&self, original: u64, assigned: u64) {
        self.inner.write().await.insert(original, assigned);
    }

    /// Looks up the assigned identifier for `original`
    pub async fn lookup(&self, original: u64) -> Option<u64> {
        self.inner.read().await.get(&original).copied()
    }

    /// Returns a point-in-time copy of all recorded mappings
    pub async fn snapshot(&self) -> HashMap<u64, u64> {
        self.inner.read().await.clone()
    }

    /// Number of recorded mappings
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether no mappings have been recorded yet
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// State shared across jobs for the duration of one run.
///
/// Jobs only ever read mappings written by jobs they depend on, so the
/// execution order enforced by the scheduler makes reads race-free in
/// practice; the locks exist because jobs run on separate tasks.
#[derive(Debug, Default)]
pub struct SharedRunContext {
    /// Issue number remappings recorded by the issues job
    pub issues: IdMap,
    /// Pull request number remappings recorded by the pull requests job
    pub pull_requests: IdMap,
}

impl SharedRunContext {
    /// Creates an empty shared context
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_id_map_records_and_looks_up() {
        let map = IdMap::new();
        map.record(17, 4).await;
        map.record(18, 5).await;

        assert_eq!(map.lookup(17).await, Some(4));
        assert_eq!(map.lookup(18).await, Some(5));
        assert_eq!(map.lookup(99).await, None);
        assert_eq!(map.len().await, 2);
    }

    #[tokio::test]
    async fn test_id_map_snapshot_is_detached() {
        let map = IdMap::new();
        map.record(1, 10).await;

        let snapshot = map.snapshot().await;
        map.record(2, 20).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(map.len().await, 2);
    }

    #[tokio::test]
    async fn test_shared_context_starts_empty() {
        let shared = SharedRunContext::new();
        assert!(shared.issues.is_empty().await);
        assert!(shared.pull_requests.is_empty().await);
    }
}
