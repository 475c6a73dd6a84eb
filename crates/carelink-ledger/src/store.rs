//! # Wallet Store
//!
//! Persistence seam for caregiver wallets. Implementations must make
//! [`WalletStore::commit`] a compare-and-swap on `version`: the write lands
//! only if the stored version still equals `expected_version`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use carelink_core::{StoreError, UserId};

use crate::wallet::CaregiverWallet;

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get(&self, caregiver: &UserId) -> Result<Option<CaregiverWallet>, StoreError>;

    /// Create a wallet. Fails with `AlreadyExists` if one is present.
    async fn insert(&self, wallet: &CaregiverWallet) -> Result<(), StoreError>;

    /// Replace the wallet iff its stored version equals `expected_version`.
    async fn commit(
        &self,
        wallet: &CaregiverWallet,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<CaregiverWallet>, StoreError>;
}

/// In-memory wallet store.
///
/// The lock is `parking_lot` and is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryWalletStore {
    data: Arc<RwLock<HashMap<UserId, CaregiverWallet>>>,
}

impl MemoryWalletStore {
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
impl WalletStore for MemoryWalletStore {
    async fn get(&self, caregiver: &UserId) -> Result<Option<CaregiverWallet>, StoreError> {
        Ok(self.data.read().get(caregiver).cloned())
    }

    async fn insert(&self, wallet: &CaregiverWallet) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        if guard.contains_key(&wallet.caregiver_id) {
            return Err(StoreError::AlreadyExists {
                entity: "wallet",
                id: wallet.caregiver_id.to_string(),
            });
        }
        guard.insert(wallet.caregiver_id, wallet.clone());
        Ok(())
    }

    async fn commit(
        &self,
        wallet: &CaregiverWallet,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        let current = guard
            .get_mut(&wallet.caregiver_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "wallet",
                id: wallet.caregiver_id.to_string(),
            })?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                entity: "wallet",
                id: wallet.caregiver_id.to_string(),
                expected: expected_version,
                found: current.version,
            });
        }
        *current = wallet.clone();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CaregiverWallet>, StoreError> {
        let mut wallets: Vec<CaregiverWallet> = self.data.read().values().cloned().collect();
        wallets.sort_by_key(|w| (w.created_at, w.caregiver_id));
        Ok(wallets)
    }
}
