//! # Application State
//!
//! [`AppConfig`] is read once from the environment at startup.
//! [`AppState`] holds the services every handler delegates to; it is cheap
//! to clone and carries no request-scoped data.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

use carelink_core::{CancelFlag, FeeRate, RetryPolicy};
use carelink_dispute::{CaseService, CaseServiceConfig, CaseStore, MemoryCaseStore};
use carelink_ledger::{Ledger, LedgerConfig, MemoryWalletStore, UnderfundedRefundPolicy, WalletStore};
use carelink_resolution::{ResolutionConfig, ResolutionEngine};

use crate::db::disputes::PgCaseStore;
use crate::db::wallets::PgWalletStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}={value:?} is invalid: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Service configuration.
///
/// `Debug` redacts the database URL, which usually embeds credentials.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub fee_rate: FeeRate,
    pub underfunded_refunds: UnderfundedRefundPolicy,
    pub store_timeout: Duration,
    pub store_max_retries: u32,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("fee_rate", &self.fee_rate)
            .field("underfunded_refunds", &self.underfunded_refunds)
            .field("store_timeout", &self.store_timeout)
            .field("store_max_retries", &self.store_max_retries)
            .field("log_format", &self.log_format)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            port: 8080,
            database_url: None,
            fee_rate: FeeRate::default(),
            underfunded_refunds: UnderfundedRefundPolicy::default(),
            store_timeout: retry.timeout,
            store_max_retries: retry.max_retries,
            log_format: LogFormat::default(),
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment. Unset variables
    /// take their defaults; set-but-malformed ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("PORT") {
            config.port = v.trim().parse().map_err(|e| invalid("PORT", &v, e))?;
        }
        config.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("PLATFORM_FEE_PERCENT") {
            config.fee_rate =
                FeeRate::from_percent_str(&v).map_err(|e| invalid("PLATFORM_FEE_PERCENT", &v, e))?;
        }
        if let Some(v) = lookup("UNDERFUNDED_REFUND_POLICY") {
            config.underfunded_refunds = UnderfundedRefundPolicy::parse(&v).ok_or_else(|| {
                invalid(
                    "UNDERFUNDED_REFUND_POLICY",
                    &v,
                    "expected reject or queue_pending",
                )
            })?;
        }
        if let Some(v) = lookup("STORE_TIMEOUT_MS") {
            let ms: u64 = v.trim().parse().map_err(|e| invalid("STORE_TIMEOUT_MS", &v, e))?;
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("STORE_MAX_RETRIES") {
            config.store_max_retries =
                v.trim().parse().map_err(|e| invalid("STORE_MAX_RETRIES", &v, e))?;
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            config.log_format = match v.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => return Err(invalid("LOG_FORMAT", &v, "expected json or pretty")),
            };
        }
        if let Some(v) = lookup("METRICS_ENABLED") {
            config.metrics_enabled = v.trim().to_ascii_lowercase() != "false";
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.store_max_retries,
            timeout: self.store_timeout,
            ..RetryPolicy::default()
        }
    }
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidVar {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cases: CaseService,
    pub ledger: Ledger,
    pub engine: ResolutionEngine,
    pub config: Arc<AppConfig>,
    /// Present in Postgres mode; `None` means in-memory stores.
    pub db_pool: Option<PgPool>,
    /// Set on shutdown; long-running admin operations stop between units
    /// of work.
    pub shutdown: CancelFlag,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Build the services over Postgres when a pool is given, otherwise
    /// over in-memory stores.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let (case_store, wallet_store): (Arc<dyn CaseStore>, Arc<dyn WalletStore>) = match &db_pool
        {
            Some(pool) => (
                Arc::new(PgCaseStore::new(pool.clone())),
                Arc::new(PgWalletStore::new(pool.clone())),
            ),
            None => (
                Arc::new(MemoryCaseStore::new()),
                Arc::new(MemoryWalletStore::new()),
            ),
        };
        Self::with_stores(config, case_store, wallet_store, db_pool)
    }

    pub fn with_stores(
        config: AppConfig,
        case_store: Arc<dyn CaseStore>,
        wallet_store: Arc<dyn WalletStore>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let retry = config.retry_policy();
        let cases = CaseService::new(
            case_store,
            CaseServiceConfig {
                retry,
                ..CaseServiceConfig::default()
            },
        );
        let ledger = Ledger::new(
            wallet_store,
            LedgerConfig {
                fee_rate: config.fee_rate,
                underfunded_refunds: config.underfunded_refunds,
                retry,
                ..LedgerConfig::default()
            },
        );
        let engine = ResolutionEngine::new(cases.clone(), ledger.clone(), ResolutionConfig::default());
        Self {
            cases,
            ledger,
            engine,
            config: Arc::new(config),
            db_pool,
            shutdown: CancelFlag::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.fee_rate.bps(), 1_000);
        assert_eq!(config.underfunded_refunds, UnderfundedRefundPolicy::Reject);
        assert_eq!(config.store_timeout, Duration::from_millis(2_000));
        assert_eq!(config.store_max_retries, 3);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("PLATFORM_FEE_PERCENT", "12.5"),
            ("UNDERFUNDED_REFUND_POLICY", "queue_pending"),
            ("STORE_TIMEOUT_MS", "750"),
            ("LOG_FORMAT", "pretty"),
            ("METRICS_ENABLED", "false"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.fee_rate.bps(), 1_250);
        assert_eq!(
            config.underfunded_refunds,
            UnderfundedRefundPolicy::QueuePending
        );
        assert_eq!(config.retry_policy().timeout, Duration::from_millis(750));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn malformed_values_are_errors() {
        for (name, value) in [
            ("PORT", "eighty"),
            ("PLATFORM_FEE_PERCENT", "-3"),
            ("UNDERFUNDED_REFUND_POLICY", "overdraw"),
            ("LOG_FORMAT", "xml"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[(name, value)])).unwrap_err();
            assert!(err.to_string().contains(name), "{err}");
        }
    }

    #[test]
    fn debug_redacts_database_url() {
        let config = AppConfig {
            database_url: Some("postgres://carelink:hunter2@db/carelink".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
