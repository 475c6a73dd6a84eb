//! Dispute case persistence on the `disputes` table.
//!
//! The case is stored whole as a JSONB document. Lifecycle rules are
//! enforced by the domain layer, not in SQL; the only database-level
//! guarantee relied on is the `WHERE version = $n` compare-and-swap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::{DisputeId, StoreError};
use carelink_dispute::migration::MigrationFailure;
use carelink_dispute::{migrate_document, CaseStore, DisputeCase, MigrationReport};

use super::{from_db_version, store_error, to_db_version};

#[derive(Debug, Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn insert(&self, case: &DisputeCase) -> Result<(), StoreError> {
        let document = encode(case)?;
        let result = sqlx::query(
            "INSERT INTO disputes
                 (id, status, dispute_type, priority, severity, document, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(*case.id.as_uuid())
        .bind(case.status.as_str())
        .bind(case.dispute_type.as_str())
        .bind(case.priority.as_str())
        .bind(case.severity.as_str())
        .bind(&document)
        .bind(to_db_version(case.version)?)
        .bind(*case.created_at.as_datetime())
        .bind(*case.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                entity: "dispute",
                id: case.id.to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, id: &DisputeId) -> Result<Option<DisputeCase>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT document FROM disputes WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.map(DocumentRow::decode).transpose()
    }

    async fn commit(&self, case: &DisputeCase, expected_version: u64) -> Result<(), StoreError> {
        let document = encode(case)?;
        let result = sqlx::query(
            "UPDATE disputes
             SET status = $1, priority = $2, severity = $3, document = $4, version = $5, updated_at = $6
             WHERE id = $7 AND version = $8",
        )
        .bind(case.status.as_str())
        .bind(case.priority.as_str())
        .bind(case.severity.as_str())
        .bind(&document)
        .bind(to_db_version(case.version)?)
        .bind(*case.updated_at.as_datetime())
        .bind(*case.id.as_uuid())
        .bind(to_db_version(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let found: Option<(i64,)> = sqlx::query_as("SELECT version FROM disputes WHERE id = $1")
            .bind(*case.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        match found {
            None => Err(StoreError::NotFound {
                entity: "dispute",
                id: case.id.to_string(),
            }),
            Some((found,)) => Err(StoreError::VersionConflict {
                entity: "dispute",
                id: case.id.to_string(),
                expected: expected_version,
                found: from_db_version(found),
            }),
        }
    }

    async fn list(&self) -> Result<Vec<DisputeCase>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT document FROM disputes ORDER BY created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows.into_iter().map(DocumentRow::decode).collect()
    }
}

/// Rewrite legacy evidence in every stored case document.
///
/// Runs once at startup, before the service accepts traffic. Documents
/// already in the structured shape are left alone; a document that cannot
/// be migrated is reported and skipped.
pub async fn migrate_legacy_evidence(pool: &PgPool) -> Result<MigrationReport, sqlx::Error> {
    let rows = sqlx::query_as::<_, RawRow>(
        "SELECT id, document, version, updated_at FROM disputes ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut report = MigrationReport::default();
    for (index, row) in rows.into_iter().enumerate() {
        report.scanned += 1;
        let mut document = row.document;
        let outcome = migrate_document(&mut document)
            .map_err(|e| e.to_string())
            .and_then(|n| {
                serde_json::from_value::<DisputeCase>(document.clone())
                    .map(|_| n)
                    .map_err(|e| format!("migrated document does not decode: {e}"))
            });
        let rewritten = match outcome {
            Ok(n) => n,
            Err(error) => {
                tracing::warn!(dispute = %row.id, error = %error, "case document failed evidence migration");
                report.failed.push(MigrationFailure {
                    index,
                    id: Some(row.id.to_string()),
                    error,
                });
                continue;
            }
        };
        if rewritten == 0 {
            continue;
        }

        let next = row.version + 1;
        document["version"] = serde_json::json!(next);
        sqlx::query(
            "UPDATE disputes SET document = $1, version = $2, updated_at = $3
             WHERE id = $4 AND version = $5",
        )
        .bind(&document)
        .bind(next)
        .bind(row.updated_at)
        .bind(row.id)
        .bind(row.version)
        .execute(pool)
        .await?;
        report.migrated += 1;
        report.evidence_rewritten += rewritten;
    }

    tracing::info!(
        scanned = report.scanned,
        migrated = report.migrated,
        evidence_rewritten = report.evidence_rewritten,
        failed = report.failed.len(),
        "legacy evidence migration finished"
    );
    Ok(report)
}

fn encode(case: &DisputeCase) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(case)
        .map_err(|e| StoreError::Serialization(format!("failed to encode dispute {}: {e}", case.id)))
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    document: serde_json::Value,
}

impl DocumentRow {
    fn decode(self) -> Result<DisputeCase, StoreError> {
        serde_json::from_value(self.document)
            .map_err(|e| StoreError::Serialization(format!("failed to decode dispute document: {e}")))
    }
}

#[derive(sqlx::FromRow)]
struct RawRow {
    id: Uuid,
    document: serde_json::Value,
    version: i64,
    updated_at: DateTime<Utc>,
}
