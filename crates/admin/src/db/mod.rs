//! Database operations for the sync admin surface.
//!
//! ## Tables
//!
//! - `app_user` - Platform users (owned by the identity service, read-only here)
//! - `lucidbot_connection` - One encrypted LucidBot token + page id per user
//! - `lucidbot_contact` - Contacts mirrored by the sync engine
//! - `tower_sessions.session` - Session storage shared with the identity service
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p lucidsync-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use lucidsync_core::UserId;

use crate::models::{Connection, ContactStats, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Storage operations needed by the admin surface.
///
/// Each method is one independent statement; atomicity of a single upsert or
/// delete is left to the backing store.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Look up any user, active or not.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// All active users, ordered by id.
    async fn list_active_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// The user's active connection, if any.
    async fn active_connection(
        &self,
        user_id: UserId,
    ) -> Result<Option<Connection>, RepositoryError>;

    /// Create the user's connection, or overwrite the existing one
    /// (token, page id, `is_active = true`, `updated_at`).
    async fn upsert_connection(
        &self,
        user_id: UserId,
        token_encrypted: &str,
        page_id: &str,
    ) -> Result<Connection, RepositoryError>;

    /// Active connections with a non-empty token, ordered by user id.
    async fn list_usable_connections(&self) -> Result<Vec<Connection>, RepositoryError>;

    /// Contact counters for one user.
    async fn contact_stats(&self, user_id: UserId) -> Result<ContactStats, RepositoryError>;

    /// Delete every contact of a user, returning how many rows went away.
    async fn delete_contacts(&self, user_id: UserId) -> Result<u64, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
