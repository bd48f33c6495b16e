use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, Postgres, Transaction,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::util::env as env_util;

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let connect_options = connect_options(database_url, env_util::ssl_insecure())?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(60))
            .connect_with(connect_options)
            .await
            .context("connecting to content database")?;
        info!(url = %env_util::redact_url(database_url), "connected to db");
        Ok(Self { pool })
    }

    /// Resolve the URL (CLI override first) and connect with a small pool.
    pub async fn from_env(cli_override: Option<String>) -> Result<Self> {
        let url = env_util::resolve_database_url(cli_override)?;
        let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 2);
        Self::connect(&url, max_conns).await
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await.context("BEGIN")?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("db pool closed");
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let visible: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = ANY (current_schemas(false)) AND table_name = $1)",
        )
        .persistent(false)
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(visible)
    }

    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
             WHERE table_schema = ANY (current_schemas(false)) AND table_name = $1 AND column_name = $2)",
        )
        .persistent(false)
        .bind(table)
        .bind(column)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }
}

/// Commit or roll back depending on the outcome of a batch, logging either way.
pub async fn finish_tx<T>(tx: Transaction<'static, Postgres>, outcome: Result<T>, dry_run: bool) -> Result<T> {
    match outcome {
        Ok(v) if dry_run => {
            tx.rollback().await.context("ROLLBACK (dry run)")?;
            info!("dry run: transaction rolled back");
            Ok(v)
        }
        Ok(v) => {
            tx.commit().await.context("COMMIT")?;
            info!("transaction committed");
            Ok(v)
        }
        Err(e) => {
            warn!(error = %e, "transaction rolled back");
            if let Err(rb) = tx.rollback().await {
                warn!(error = %rb, "rollback failed");
            }
            Err(e)
        }
    }
}

const APPLICATION_NAME: &str = "content_maint";

fn connect_options(database_url: &str, insecure_tls: bool) -> Result<PgConnectOptions> {
    // PgBouncer transaction mode safe: no server-side prepared statement cache.
    let mut opts = PgConnectOptions::from_str(database_url)
        .context("parsing database URL")?
        .statement_cache_capacity(0);
    if opts.get_application_name().is_none() {
        opts = opts.application_name(APPLICATION_NAME);
    }
    if database_url.contains("sslmode=disable") {
        return Ok(opts);
    }
    // Require encrypts without verifying the certificate chain.
    if insecure_tls || database_url.contains("sslmode=require") {
        opts = opts.ssl_mode(PgSslMode::Require);
    }
    Ok(opts)
}

pub fn is_undefined_table_error(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("42P01"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insecure_tls_forces_require() {
        let opts = connect_options("postgres://u:p@localhost/db", true).unwrap();
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Require));
    }

    #[test]
    fn explicit_disable_wins() {
        let opts = connect_options("postgres://u:p@localhost/db?sslmode=disable", true).unwrap();
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Disable));
    }

    #[test]
    fn secure_mode_keeps_dsn_default() {
        let opts = connect_options("postgres://u:p@localhost/db", false).unwrap();
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Prefer));
    }

    #[test]
    fn sessions_are_labelled() {
        let opts = connect_options("postgres://u:p@localhost/db", false).unwrap();
        assert_eq!(opts.get_application_name(), Some("content_maint"));
        let named = connect_options("postgres://u:p@localhost/db?application_name=nightly", false).unwrap();
        assert_eq!(named.get_application_name(), Some("nightly"));
    }

    #[test]
    fn non_database_errors_are_not_classified() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_undefined_table_error(&err));
    }
}
