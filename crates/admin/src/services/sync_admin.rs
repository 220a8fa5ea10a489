//! Admin operations over LucidBot credentials and mirrored contacts.
//!
//! Every operation takes the calling [`CurrentUser`] and refuses non-admins
//! before touching anything else.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, instrument, warn};

use lucidsync_core::{Email, UserId};

use crate::crypto::{CipherError, TokenCipher};
use crate::db::{AdminStore, RepositoryError};
use crate::lucidbot::{TokenValidator, token_expiry};
use crate::models::{Connection, CurrentUser, User, UserStatus};
use crate::sync::{DispatchError, SyncDispatcher, SyncJob};

/// Errors returned by [`SyncAdminService`].
#[derive(Debug, Error)]
pub enum SyncAdminError {
    #[error("Admin role required")]
    PermissionDenied,

    #[error("User not found")]
    NotFound,

    /// LucidBot refused the candidate token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("User {0} has no LucidBot token configured")]
    NoCredentials(Email),

    #[error("No users with a configured LucidBot token")]
    NoEligibleUsers,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result of a successful `set_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub email: Email,
    /// `recordsTotal` reported by LucidBot during validation.
    pub total_contacts: i64,
}

/// Result of a successful `clear_contacts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactsCleared {
    pub email: Email,
    pub deleted: u64,
}

/// Sync administration service.
#[derive(Clone)]
pub struct SyncAdminService {
    store: Arc<dyn AdminStore>,
    validator: Arc<dyn TokenValidator>,
    cipher: TokenCipher,
    dispatcher: SyncDispatcher,
}

impl SyncAdminService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AdminStore>,
        validator: Arc<dyn TokenValidator>,
        cipher: TokenCipher,
        dispatcher: SyncDispatcher,
    ) -> Self {
        Self {
            store,
            validator,
            cipher,
            dispatcher,
        }
    }

    /// Sync status of every active user, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-admins and `Repository` on storage
    /// failures. Undecodable tokens only blank out `token_expires`.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn list_status(
        &self,
        caller: &CurrentUser,
    ) -> Result<Vec<UserStatus>, SyncAdminError> {
        require_admin(caller)?;

        let users = self.store.list_active_users().await?;
        let mut statuses = Vec::with_capacity(users.len());

        for user in users {
            let connection = self.store.active_connection(user.id).await?;
            let stats = self.store.contact_stats(user.id).await?;

            let stored_token = connection.as_ref().and_then(Connection::stored_token);
            let token_expires = stored_token.and_then(|blob| match self.cipher.decrypt(blob) {
                Ok(token) => token_expiry(&token),
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "Stored token could not be decrypted");
                    None
                }
            });

            statuses.push(UserStatus {
                user_id: user.id,
                email: user.email,
                name: user.name,
                has_jwt_token: stored_token.is_some(),
                page_id: connection.and_then(|c| c.page_id),
                token_expires,
                total_contacts: stats.total,
                total_ventas: stats.sales,
                last_sync: stats.last_synced_at,
            });
        }

        Ok(statuses)
    }

    /// Validate `token` against LucidBot and store it for `user_id`.
    ///
    /// A rejected token leaves the user's connection untouched.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied`, `NotFound`, `InvalidToken` with the
    /// validator's reason, or an infrastructure error.
    #[instrument(skip(self, caller, token), fields(caller = %caller.id, %user_id))]
    pub async fn set_token(
        &self,
        caller: &CurrentUser,
        user_id: UserId,
        token: &str,
        page_id: &str,
    ) -> Result<TokenSet, SyncAdminError> {
        require_admin(caller)?;
        let user = self.resolve_user(user_id).await?;

        let validation = self.validator.validate(token, page_id).await;
        if !validation.ok {
            let reason = validation
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(SyncAdminError::InvalidToken(reason));
        }

        let encrypted = self.cipher.encrypt(token)?;
        self.store
            .upsert_connection(user.id, &encrypted, page_id)
            .await?;

        let total_contacts = validation.total_contacts.unwrap_or(0);
        info!(email = %user.email, total_contacts, "LucidBot token configured");

        Ok(TokenSet {
            email: user.email,
            total_contacts,
        })
    }

    /// Schedule a sync for one user. Returns the user's email once queued.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied`, `NotFound`, `NoCredentials` when the user
    /// has no active connection with a token, or an infrastructure error.
    #[instrument(skip(self, caller), fields(caller = %caller.id, %user_id))]
    pub async fn sync_user(
        &self,
        caller: &CurrentUser,
        user_id: UserId,
    ) -> Result<Email, SyncAdminError> {
        require_admin(caller)?;
        let user = self.resolve_user(user_id).await?;

        let connection = self
            .store
            .active_connection(user.id)
            .await?
            .filter(Connection::is_usable);
        let Some(connection) = connection else {
            return Err(SyncAdminError::NoCredentials(user.email));
        };

        self.dispatcher.schedule(self.job_for(&connection)?).await?;
        info!(email = %user.email, "Sync scheduled");

        Ok(user.email)
    }

    /// Schedule a sync for every user with a usable connection.
    ///
    /// Connections whose user no longer resolves, or whose token cannot be
    /// decrypted, are skipped. Returns the emails of the scheduled users.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied`, `NoEligibleUsers` when no usable
    /// connection exists, or an infrastructure error.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn sync_all(&self, caller: &CurrentUser) -> Result<Vec<Email>, SyncAdminError> {
        require_admin(caller)?;

        let connections = self.store.list_usable_connections().await?;
        if connections.is_empty() {
            return Err(SyncAdminError::NoEligibleUsers);
        }

        let mut scheduled = Vec::with_capacity(connections.len());
        for connection in connections {
            let user = match self.store.get_user(connection.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => continue,
                Err(e) => {
                    warn!(user_id = %connection.user_id, error = %e, "Skipping sync, user lookup failed");
                    continue;
                }
            };

            let job = match self.job_for(&connection) {
                Ok(job) => job,
                Err(e) => {
                    warn!(email = %user.email, error = %e, "Skipping sync, stored token unreadable");
                    continue;
                }
            };

            self.dispatcher.schedule(job).await?;
            scheduled.push(user.email);
        }

        info!(count = scheduled.len(), "Bulk sync scheduled");
        Ok(scheduled)
    }

    /// Delete every mirrored contact of a user. The connection is kept.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied`, `NotFound`, or `Repository`.
    #[instrument(skip(self, caller), fields(caller = %caller.id, %user_id))]
    pub async fn clear_contacts(
        &self,
        caller: &CurrentUser,
        user_id: UserId,
    ) -> Result<ContactsCleared, SyncAdminError> {
        require_admin(caller)?;
        let user = self.resolve_user(user_id).await?;

        let deleted = self.store.delete_contacts(user.id).await?;
        info!(email = %user.email, deleted, "Contacts cleared");

        Ok(ContactsCleared {
            email: user.email,
            deleted,
        })
    }

    /// Storage handle, for readiness checks.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AdminStore> {
        &self.store
    }

    async fn resolve_user(&self, user_id: UserId) -> Result<User, SyncAdminError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(SyncAdminError::NotFound)
    }

    fn job_for(&self, connection: &Connection) -> Result<SyncJob, SyncAdminError> {
        let blob = connection.stored_token().unwrap_or_default();
        let token = self.cipher.decrypt(blob)?;

        Ok(SyncJob {
            user_id: connection.user_id,
            token: SecretString::from(token),
            page_id: connection.page_id.clone().unwrap_or_default(),
        })
    }
}

fn require_admin(caller: &CurrentUser) -> Result<(), SyncAdminError> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(SyncAdminError::PermissionDenied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tokio::sync::mpsc;

    use super::*;
    use crate::db::MemoryStore;
    use crate::lucidbot::TokenValidation;

    const KEY: &str = "q3J9vX0bLk2mT8wZr5Yc1HfN7uGd4Ea6Ps0Qi9Oj2Bs=";

    struct FixedValidator(TokenValidation);

    #[async_trait]
    impl TokenValidator for FixedValidator {
        async fn validate(&self, _token: &str, _page_id: &str) -> TokenValidation {
            self.0.clone()
        }
    }

    struct Harness {
        service: SyncAdminService,
        store: MemoryStore,
        cipher: TokenCipher,
        jobs: mpsc::Receiver<SyncJob>,
    }

    fn harness(validation: TokenValidation) -> Harness {
        harness_with_capacity(validation, 16)
    }

    fn harness_with_capacity(validation: TokenValidation, capacity: usize) -> Harness {
        let store = MemoryStore::new();
        let cipher = TokenCipher::from_base64_key(&SecretString::from(KEY.to_string())).unwrap();
        let (dispatcher, jobs) = SyncDispatcher::channel(capacity);
        let service = SyncAdminService::new(
            Arc::new(store.clone()),
            Arc::new(FixedValidator(validation)),
            cipher.clone(),
            dispatcher,
        );
        Harness {
            service,
            store,
            cipher,
            jobs,
        }
    }

    fn admin() -> CurrentUser {
        CurrentUser {
            id: UserId::new(100),
            email: Email::parse("admin@example.com").unwrap(),
            name: Some("Admin".to_string()),
            is_admin: true,
        }
    }

    fn member() -> CurrentUser {
        CurrentUser {
            is_admin: false,
            ..admin()
        }
    }

    fn user(id: i64) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("u{id}@example.com")).unwrap(),
            name: None,
            is_active: true,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_non_admin_is_refused() {
        let h = harness(TokenValidation::accepted(1));
        h.store.put_user(user(1)).await;
        let uid = UserId::new(1);

        assert!(matches!(
            h.service.list_status(&member()).await,
            Err(SyncAdminError::PermissionDenied)
        ));
        assert!(matches!(
            h.service.set_token(&member(), uid, "t", "p").await,
            Err(SyncAdminError::PermissionDenied)
        ));
        assert!(matches!(
            h.service.sync_user(&member(), uid).await,
            Err(SyncAdminError::PermissionDenied)
        ));
        assert!(matches!(
            h.service.sync_all(&member()).await,
            Err(SyncAdminError::PermissionDenied)
        ));
        assert!(matches!(
            h.service.clear_contacts(&member(), uid).await,
            Err(SyncAdminError::PermissionDenied)
        ));
        assert!(h.store.connections_for(uid).await.is_empty());
    }

    #[tokio::test]
    async fn test_set_token_encrypts_and_upserts() {
        let h = harness(TokenValidation::accepted(57));
        h.store.put_user(user(1)).await;
        let uid = UserId::new(1);

        let first = h.service.set_token(&admin(), uid, "tok-a", "pg-1").await.unwrap();
        assert_eq!(first.total_contacts, 57);
        h.service.set_token(&admin(), uid, "tok-b", "pg-2").await.unwrap();

        let connections = h.store.connections_for(uid).await;
        assert_eq!(connections.len(), 1);
        let stored = connections[0].stored_token().unwrap();
        assert_ne!(stored, "tok-b");
        assert_eq!(h.cipher.decrypt(stored).unwrap(), "tok-b");
        assert_eq!(connections[0].page_id.as_deref(), Some("pg-2"));
    }

    #[tokio::test]
    async fn test_rejected_token_leaves_connection_alone() {
        let h = harness(TokenValidation::rejected("HTTP 401"));
        h.store.put_user(user(1)).await;
        let uid = UserId::new(1);
        let before = h.store.put_connection(uid, Some("old-blob"), Some("pg"), false).await;

        let err = h.service.set_token(&admin(), uid, "bad", "pg").await.unwrap_err();
        assert!(matches!(&err, SyncAdminError::InvalidToken(reason) if reason == "HTTP 401"));
        assert_eq!(h.store.connections_for(uid).await, vec![before]);
    }

    #[tokio::test]
    async fn test_set_token_unknown_user() {
        let h = harness(TokenValidation::accepted(1));
        assert!(matches!(
            h.service.set_token(&admin(), UserId::new(9), "t", "p").await,
            Err(SyncAdminError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_sync_user_queues_decrypted_job() {
        let mut h = harness(TokenValidation::accepted(1));
        h.store.put_user(user(1)).await;
        let uid = UserId::new(1);
        let blob = h.cipher.encrypt("secret-jwt").unwrap();
        h.store.put_connection(uid, Some(&blob), Some("pg-5"), true).await;

        let email = h.service.sync_user(&admin(), uid).await.unwrap();
        assert_eq!(email.as_str(), "u1@example.com");

        let job = h.jobs.try_recv().unwrap();
        assert_eq!(job.user_id, uid);
        assert_eq!(job.token.expose_secret(), "secret-jwt");
        assert_eq!(job.page_id, "pg-5");
        assert!(h.jobs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sync_user_without_usable_connection() {
        let mut h = harness(TokenValidation::accepted(1));
        h.store.put_user(user(1)).await;
        h.store.put_user(user(2)).await;
        h.store.put_connection(UserId::new(2), Some(""), Some("pg"), true).await;

        for id in [1, 2] {
            assert!(matches!(
                h.service.sync_user(&admin(), UserId::new(id)).await,
                Err(SyncAdminError::NoCredentials(_))
            ));
        }
        assert!(h.jobs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sync_all_skips_missing_users() {
        let mut h = harness(TokenValidation::accepted(1));
        for id in [1, 2] {
            h.store.put_user(user(id)).await;
        }
        for id in [1, 2, 3] {
            let blob = h.cipher.encrypt(&format!("tok-{id}")).unwrap();
            h.store.put_connection(UserId::new(id), Some(&blob), Some("pg"), true).await;
        }
        h.store.put_connection(UserId::new(4), Some("x"), Some("pg"), false).await;

        let emails = h.service.sync_all(&admin()).await.unwrap();
        let emails: Vec<&str> = emails.iter().map(Email::as_str).collect();
        assert_eq!(emails, vec!["u1@example.com", "u2@example.com"]);

        let mut queued = 0;
        while h.jobs.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, 2);
    }

    #[tokio::test]
    async fn test_sync_all_schedules_more_users_than_queue_capacity() {
        let h = harness_with_capacity(TokenValidation::accepted(1), 2);
        for id in 1..=5 {
            h.store.put_user(user(id)).await;
            let blob = h.cipher.encrypt(&format!("tok-{id}")).unwrap();
            h.store.put_connection(UserId::new(id), Some(&blob), Some("pg"), true).await;
        }

        let mut jobs = h.jobs;
        let drain = tokio::spawn(async move {
            let mut seen = Vec::new();
            while seen.len() < 5 {
                match jobs.recv().await {
                    Some(job) => seen.push(job.user_id),
                    None => break,
                }
            }
            seen
        });

        let emails = h.service.sync_all(&admin()).await.unwrap();
        assert_eq!(emails.len(), 5);

        let seen = drain.await.unwrap();
        assert_eq!(seen, (1..=5).map(UserId::new).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_sync_all_without_eligible_users() {
        let h = harness(TokenValidation::accepted(1));
        h.store.put_user(user(1)).await;
        h.store.put_connection(UserId::new(1), None, Some("pg"), true).await;

        assert!(matches!(
            h.service.sync_all(&admin()).await,
            Err(SyncAdminError::NoEligibleUsers)
        ));
    }

    #[tokio::test]
    async fn test_clear_contacts_counts_only_target() {
        let h = harness(TokenValidation::accepted(1));
        h.store.put_user(user(1)).await;
        let now = Utc::now();
        for _ in 0..3 {
            h.store.put_contact(UserId::new(1), Some(Decimal::ONE), now).await;
        }
        h.store.put_contact(UserId::new(2), None, now).await;

        let cleared = h.service.clear_contacts(&admin(), UserId::new(1)).await.unwrap();
        assert_eq!(cleared.deleted, 3);
        assert!(h.store.contacts_for(UserId::new(1)).await.is_empty());
        assert_eq!(h.store.contacts_for(UserId::new(2)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_status_tolerates_bad_tokens() {
        let h = harness(TokenValidation::accepted(1));
        h.store.put_user(user(2)).await;
        h.store.put_user(user(1)).await;
        h.store.put_connection(UserId::new(2), Some("not-a-blob"), Some("pg"), true).await;

        let statuses = h.service.list_status(&admin()).await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].user_id, UserId::new(1));
        assert!(!statuses[0].has_jwt_token);
        assert!(statuses[1].has_jwt_token);
        assert_eq!(statuses[1].token_expires, None);
    }
}
