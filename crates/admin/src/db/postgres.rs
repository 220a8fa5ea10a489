//! `PostgreSQL` implementation of [`AdminStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use lucidsync_core::{ConnectionId, Email, UserId};

use super::{AdminStore, RepositoryError};
use crate::models::{Connection, ContactStats, User};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: Option<String>,
    is_active: bool,
    is_admin: bool,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for user {}: {e}", row.id))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            is_active: row.is_active,
            is_admin: row.is_admin,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    id: i64,
    user_id: i64,
    jwt_token_encrypted: Option<String>,
    page_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConnectionRow> for Connection {
    fn from(row: ConnectionRow) -> Self {
        Self {
            id: ConnectionId::new(row.id),
            user_id: UserId::new(row.user_id),
            token_encrypted: row.jwt_token_encrypted,
            page_id: row.page_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactStatsRow {
    total: i64,
    sales: i64,
    last_synced_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, email, name, is_active, is_admin";
const CONNECTION_COLUMNS: &str =
    "id, user_id, jwt_token_encrypted, page_id, is_active, created_at, updated_at";

// =============================================================================
// Store
// =============================================================================

/// Admin store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (shared with the session store).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_active_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE is_active ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn active_connection(
        &self,
        user_id: UserId,
    ) -> Result<Option<Connection>, RepositoryError> {
        let row = sqlx::query_as::<_, ConnectionRow>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM lucidbot_connection \
             WHERE user_id = $1 AND is_active"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Connection::from))
    }

    async fn upsert_connection(
        &self,
        user_id: UserId,
        token_encrypted: &str,
        page_id: &str,
    ) -> Result<Connection, RepositoryError> {
        let row = sqlx::query_as::<_, ConnectionRow>(&format!(
            r"
            INSERT INTO lucidbot_connection (user_id, jwt_token_encrypted, page_id, is_active)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (user_id) DO UPDATE SET
                jwt_token_encrypted = EXCLUDED.jwt_token_encrypted,
                page_id = EXCLUDED.page_id,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING {CONNECTION_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(token_encrypted)
        .bind(page_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_usable_connections(&self) -> Result<Vec<Connection>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConnectionRow>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM lucidbot_connection \
             WHERE is_active AND COALESCE(jwt_token_encrypted, '') <> '' \
             ORDER BY user_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Connection::from).collect())
    }

    async fn contact_stats(&self, user_id: UserId) -> Result<ContactStats, RepositoryError> {
        let row = sqlx::query_as::<_, ContactStatsRow>(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE total_a_pagar > 0) AS sales,
                   MAX(synced_at) AS last_synced_at
            FROM lucidbot_contact
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ContactStats {
            total: row.total,
            sales: row.sales,
            last_synced_at: row.last_synced_at,
        })
    }

    async fn delete_contacts(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM lucidbot_contact WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
