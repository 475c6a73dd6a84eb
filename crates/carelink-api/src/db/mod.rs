//! # Database Persistence Layer
//!
//! Optional PostgreSQL persistence via SQLx. When `DATABASE_URL` is set,
//! dispute cases and caregiver wallets are stored as JSONB documents with a
//! `version` column used for compare-and-swap. When absent, the service
//! runs on in-memory stores (development and tests).
//!
//! Both stores implement the domain crates' store traits, so nothing above
//! this module knows which backend is in use.

pub mod disputes;
pub mod wallets;

use sqlx::postgres::{PgPool, PgPoolOptions};

use carelink_core::StoreError;

use crate::state::AppConfig;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no database URL is configured (in-memory mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(config: &AppConfig) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             Cases and wallets will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Map a driver error onto the store error the domain retries on.
///
/// Connection-level failures are transient; everything else is not.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
            StoreError::Serialization(err.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

pub(crate) fn to_db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version)
        .map_err(|_| StoreError::Serialization(format!("version {version} out of range")))
}

pub(crate) fn from_db_version(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_transient() {
        assert!(store_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(store_error(sqlx::Error::PoolClosed).is_transient());
        assert!(!store_error(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn versions_round_trip() {
        assert_eq!(to_db_version(7).unwrap(), 7);
        assert!(to_db_version(u64::MAX).is_err());
        assert_eq!(from_db_version(-1), 0);
    }
}
