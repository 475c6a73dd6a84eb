//! Caregiver wallet persistence on the `caregiver_wallets` table.
//!
//! Same document-plus-version layout as the disputes table. The balance
//! column is a copy for operators' ad hoc queries; the document's
//! transaction list is authoritative.

use async_trait::async_trait;
use sqlx::PgPool;

use carelink_core::{StoreError, UserId};
use carelink_ledger::{CaregiverWallet, WalletStore};

use super::{from_db_version, store_error, to_db_version};

#[derive(Debug, Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn get(&self, caregiver: &UserId) -> Result<Option<CaregiverWallet>, StoreError> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT document FROM caregiver_wallets WHERE caregiver_id = $1",
        )
        .bind(*caregiver.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.map(WalletRow::decode).transpose()
    }

    async fn insert(&self, wallet: &CaregiverWallet) -> Result<(), StoreError> {
        let document = encode(wallet)?;
        let result = sqlx::query(
            "INSERT INTO caregiver_wallets (caregiver_id, available_balance, document, version, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (caregiver_id) DO NOTHING",
        )
        .bind(*wallet.caregiver_id.as_uuid())
        .bind(wallet.available_balance.minor_units())
        .bind(&document)
        .bind(to_db_version(wallet.version)?)
        .bind(*wallet.last_updated.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                entity: "wallet",
                id: wallet.caregiver_id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(
        &self,
        wallet: &CaregiverWallet,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let document = encode(wallet)?;
        let result = sqlx::query(
            "UPDATE caregiver_wallets
             SET available_balance = $1, document = $2, version = $3, updated_at = $4
             WHERE caregiver_id = $5 AND version = $6",
        )
        .bind(wallet.available_balance.minor_units())
        .bind(&document)
        .bind(to_db_version(wallet.version)?)
        .bind(*wallet.last_updated.as_datetime())
        .bind(*wallet.caregiver_id.as_uuid())
        .bind(to_db_version(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let found: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM caregiver_wallets WHERE caregiver_id = $1")
                .bind(*wallet.caregiver_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        match found {
            None => Err(StoreError::NotFound {
                entity: "wallet",
                id: wallet.caregiver_id.to_string(),
            }),
            Some((found,)) => Err(StoreError::VersionConflict {
                entity: "wallet",
                id: wallet.caregiver_id.to_string(),
                expected: expected_version,
                found: from_db_version(found),
            }),
        }
    }

    async fn list(&self) -> Result<Vec<CaregiverWallet>, StoreError> {
        let rows = sqlx::query_as::<_, WalletRow>(
            "SELECT document FROM caregiver_wallets ORDER BY caregiver_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows.into_iter().map(WalletRow::decode).collect()
    }
}

fn encode(wallet: &CaregiverWallet) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(wallet).map_err(|e| {
        StoreError::Serialization(format!(
            "failed to encode wallet {}: {e}",
            wallet.caregiver_id
        ))
    })
}

#[derive(sqlx::FromRow)]
struct WalletRow {
    document: serde_json::Value,
}

impl WalletRow {
    fn decode(self) -> Result<CaregiverWallet, StoreError> {
        serde_json::from_value(self.document)
            .map_err(|e| StoreError::Serialization(format!("failed to decode wallet document: {e}")))
    }
}
