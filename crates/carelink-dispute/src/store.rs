//! # Case Store
//!
//! Persistence seam for dispute cases. [`CaseStore::commit`] is a
//! compare-and-swap on `version`, which is what serializes concurrent
//! writers to one case.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use carelink_core::{DisputeId, StoreError};

use crate::case::DisputeCase;
use crate::model::{DisputeType, Priority, Severity};
use crate::status::DisputeStatus;

#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Create a case. Fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, case: &DisputeCase) -> Result<(), StoreError>;

    async fn get(&self, id: &DisputeId) -> Result<Option<DisputeCase>, StoreError>;

    /// Replace the case iff its stored version equals `expected_version`.
    async fn commit(&self, case: &DisputeCase, expected_version: u64) -> Result<(), StoreError>;

    /// Every case, newest first.
    async fn list(&self) -> Result<Vec<DisputeCase>, StoreError>;
}

/// Optional equality filters over the classification fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilter {
    pub status: Option<DisputeStatus>,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    #[serde(rename = "type")]
    pub dispute_type: Option<DisputeType>,
}

impl CaseFilter {
    pub fn matches(&self, case: &DisputeCase) -> bool {
        self.status.map_or(true, |s| case.status == s)
            && self.priority.map_or(true, |p| case.priority == p)
            && self.severity.map_or(true, |s| case.severity == s)
            && self.dispute_type.map_or(true, |t| case.dispute_type == t)
    }
}

/// In-memory case store. The lock is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCaseStore {
    data: Arc<RwLock<HashMap<DisputeId, DisputeCase>>>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn insert(&self, case: &DisputeCase) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        if guard.contains_key(&case.id) {
            return Err(StoreError::AlreadyExists {
                entity: "dispute",
                id: case.id.to_string(),
            });
        }
        guard.insert(case.id, case.clone());
        Ok(())
    }

    async fn get(&self, id: &DisputeId) -> Result<Option<DisputeCase>, StoreError> {
        Ok(self.data.read().get(id).cloned())
    }

    async fn commit(&self, case: &DisputeCase, expected_version: u64) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        let current = guard.get_mut(&case.id).ok_or_else(|| StoreError::NotFound {
            entity: "dispute",
            id: case.id.to_string(),
        })?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                entity: "dispute",
                id: case.id.to_string(),
                expected: expected_version,
                found: current.version,
            });
        }
        *current = case.clone();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DisputeCase>, StoreError> {
        let mut cases: Vec<DisputeCase> = self.data.read().values().cloned().collect();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::tests::new_dispute;
    use carelink_core::Timestamp;

    fn case() -> DisputeCase {
        DisputeCase::open(new_dispute(), Timestamp::now()).unwrap()
    }

    #[tokio::test]
    async fn stale_commit_is_rejected() {
        let store = MemoryCaseStore::new();
        let mut c = case();
        store.insert(&c).await.unwrap();

        c.version = 1;
        store.commit(&c, 0).await.unwrap();
        assert!(matches!(
            store.commit(&c, 0).await,
            Err(StoreError::VersionConflict { found: 1, .. })
        ));
        assert!(matches!(
            store.insert(&c).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn filter_matches_each_field() {
        let c = case();
        assert!(CaseFilter::default().matches(&c));
        assert!(CaseFilter {
            status: Some(DisputeStatus::Pending),
            severity: Some(Severity::High),
            ..CaseFilter::default()
        }
        .matches(&c));
        assert!(!CaseFilter {
            dispute_type: Some(DisputeType::SafetyConcern),
            ..CaseFilter::default()
        }
        .matches(&c));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryCaseStore::new();
        let mut older = case();
        older.created_at = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let newer = case();
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();
        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }
}
