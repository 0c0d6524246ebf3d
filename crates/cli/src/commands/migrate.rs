//! Session-store migration.
//!
//! The storefront keeps its sessions in `PostgreSQL` through
//! `tower-sessions-sqlx-store`. This command creates the schema and table
//! that store needs; it is idempotent.
//!
//! # Usage
//!
//! ```bash
//! garagehub migrate
//! ```
//!
//! # Environment Variables
//!
//! - `GARAGEHUB_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from the migrate command.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("GARAGEHUB_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("GARAGEHUB_DATABASE_URL"))
}

/// Create the session table.
///
/// # Errors
///
/// Returns an error when the URL is missing or the database rejects the
/// statements.
pub async fn sessions() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();
    let database_url = database_url()?;

    tracing::info!("Connecting to session database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Creating session store schema...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store ready");
    Ok(())
}
