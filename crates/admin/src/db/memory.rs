//! In-memory implementation of [`AdminStore`].
//!
//! Used by the test suites and for running the router without a database.
//! Contacts are seeded directly since the sync engine is what writes them
//! in production.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use lucidsync_core::{ConnectionId, ContactId, UserId};

use super::{AdminStore, RepositoryError};
use crate::models::{Connection, ContactStats, User};

/// A mirrored contact row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub id: ContactId,
    pub user_id: UserId,
    /// Remote "total a pagar" field.
    pub amount_owed: Option<Decimal>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    connections: Vec<Connection>,
    contacts: Vec<ContactRecord>,
    next_connection_id: i64,
    next_contact_id: i64,
}

/// Admin store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn put_user(&self, user: User) {
        let mut tables = self.tables.write().await;
        tables.users.retain(|u| u.id != user.id);
        tables.users.push(user);
    }

    /// Insert a raw connection row, bypassing validation and encryption.
    pub async fn put_connection(
        &self,
        user_id: UserId,
        token_encrypted: Option<&str>,
        page_id: Option<&str>,
        is_active: bool,
    ) -> Connection {
        let mut tables = self.tables.write().await;
        tables.next_connection_id += 1;
        let now = Utc::now();
        let connection = Connection {
            id: ConnectionId::new(tables.next_connection_id),
            user_id,
            token_encrypted: token_encrypted.map(String::from),
            page_id: page_id.map(String::from),
            is_active,
            created_at: now,
            updated_at: now,
        };
        tables.connections.push(connection.clone());
        connection
    }

    /// Record a synced contact for a user.
    pub async fn put_contact(
        &self,
        user_id: UserId,
        amount_owed: Option<Decimal>,
        synced_at: DateTime<Utc>,
    ) -> ContactId {
        let mut tables = self.tables.write().await;
        tables.next_contact_id += 1;
        let id = ContactId::new(tables.next_contact_id);
        tables.contacts.push(ContactRecord {
            id,
            user_id,
            amount_owed,
            synced_at,
        });
        id
    }

    /// Every connection row for a user, active or not.
    pub async fn connections_for(&self, user_id: UserId) -> Vec<Connection> {
        self.tables
            .read()
            .await
            .connections
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every contact row for a user.
    pub async fn contacts_for(&self, user_id: UserId) -> Vec<ContactRecord> {
        self.tables
            .read()
            .await
            .contacts
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_active_users(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.iter().filter(|u| u.is_active).cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn active_connection(
        &self,
        user_id: UserId,
    ) -> Result<Option<Connection>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .connections
            .iter()
            .find(|c| c.user_id == user_id && c.is_active)
            .cloned())
    }

    async fn upsert_connection(
        &self,
        user_id: UserId,
        token_encrypted: &str,
        page_id: &str,
    ) -> Result<Connection, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) = tables.connections.iter_mut().find(|c| c.user_id == user_id) {
            existing.token_encrypted = Some(token_encrypted.to_string());
            existing.page_id = Some(page_id.to_string());
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        tables.next_connection_id += 1;
        let connection = Connection {
            id: ConnectionId::new(tables.next_connection_id),
            user_id,
            token_encrypted: Some(token_encrypted.to_string()),
            page_id: Some(page_id.to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.connections.push(connection.clone());
        Ok(connection)
    }

    async fn list_usable_connections(&self) -> Result<Vec<Connection>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut connections: Vec<Connection> = tables
            .connections
            .iter()
            .filter(|c| c.is_usable())
            .cloned()
            .collect();
        connections.sort_by_key(|c| c.user_id);
        Ok(connections)
    }

    async fn contact_stats(&self, user_id: UserId) -> Result<ContactStats, RepositoryError> {
        let tables = self.tables.read().await;
        let owned = tables.contacts.iter().filter(|c| c.user_id == user_id);

        let mut stats = ContactStats::default();
        for contact in owned {
            stats.total += 1;
            if contact.amount_owed.is_some_and(|amount| amount > Decimal::ZERO) {
                stats.sales += 1;
            }
            stats.last_synced_at = stats.last_synced_at.max(Some(contact.synced_at));
        }
        Ok(stats)
    }

    async fn delete_contacts(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.contacts.len();
        tables.contacts.retain(|c| c.user_id != user_id);
        Ok((before - tables.contacts.len()) as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use lucidsync_core::Email;

    use super::*;

    fn user(id: i64, active: bool) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            name: None,
            is_active: active,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_list_active_users_filters_and_orders() {
        let store = MemoryStore::new();
        store.put_user(user(3, true)).await;
        store.put_user(user(1, true)).await;
        store.put_user(user(2, false)).await;

        let ids: Vec<i64> = store
            .list_active_users()
            .await
            .unwrap()
            .iter()
            .map(|u| u.id.as_i64())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_upsert_reactivates_inactive_connection() {
        let store = MemoryStore::new();
        let uid = UserId::new(1);
        store.put_connection(uid, Some("old"), Some("p1"), false).await;

        let updated = store.upsert_connection(uid, "new", "p2").await.unwrap();

        assert!(updated.is_active);
        assert_eq!(updated.token_encrypted.as_deref(), Some("new"));
        assert_eq!(store.connections_for(uid).await.len(), 1);
    }

    #[tokio::test]
    async fn test_contact_stats_counts_positive_amounts_only() {
        let store = MemoryStore::new();
        let uid = UserId::new(1);
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        store.put_contact(uid, Some(Decimal::new(1500, 2)), early).await;
        store.put_contact(uid, Some(Decimal::ZERO), late).await;
        store.put_contact(uid, None, early).await;
        store.put_contact(UserId::new(2), Some(Decimal::ONE), late).await;

        let stats = store.contact_stats(uid).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.sales, 1);
        assert_eq!(stats.last_synced_at, Some(late));
    }
}
