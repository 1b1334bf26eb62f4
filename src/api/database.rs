//! Database collaborator consumed by the dependency-health endpoint.
//!
//! The router only needs two answers: "is a database wired up at all?" and
//! "can we talk to it right now?". [`PostgresProbe`] answers the second by
//! opening a session with the configured URL and running `SELECT 1`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time;
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("database is not configured")]
    NotConfigured,

    #[error("invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("database check timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("database check failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

/// Opaque data-access collaborator.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// True when a database URL was supplied. No I/O.
    fn is_configured(&self) -> bool;

    /// Check connectivity.
    async fn test_connection(&self) -> Result<(), ProbeError>;
}

#[derive(Debug, Clone)]
enum ProbeTarget {
    Unconfigured,
    Invalid(String),
    Postgres(Box<tokio_postgres::Config>),
}

/// Runs `SELECT 1` against the configured Postgres URL.
#[derive(Debug, Clone)]
pub struct PostgresProbe {
    target: ProbeTarget,
    timeout: Duration,
}

impl PostgresProbe {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let target = match config.url.as_deref() {
            None => ProbeTarget::Unconfigured,
            Some(raw) => match raw.parse::<tokio_postgres::Config>() {
                Ok(mut pg) => {
                    pg.connect_timeout(timeout);
                    ProbeTarget::Postgres(Box::new(pg))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Database URL is not usable; health checks will fail");
                    ProbeTarget::Invalid(e.to_string())
                }
            },
        };

        Self { target, timeout }
    }
}

async fn select_one(config: &tokio_postgres::Config) -> Result<(), ProbeError> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(error = %e, "Database probe connection closed with error");
        }
    });
    client.simple_query("SELECT 1").await?;
    Ok(())
}

#[async_trait]
impl DatabaseProbe for PostgresProbe {
    fn is_configured(&self) -> bool {
        !matches!(self.target, ProbeTarget::Unconfigured)
    }

    async fn test_connection(&self) -> Result<(), ProbeError> {
        let config = match &self.target {
            ProbeTarget::Unconfigured => return Err(ProbeError::NotConfigured),
            ProbeTarget::Invalid(reason) => return Err(ProbeError::InvalidUrl(reason.clone())),
            ProbeTarget::Postgres(config) => config,
        };

        match time::timeout(self.timeout, select_one(config)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout { timeout: self.timeout }),
        }
    }
}
