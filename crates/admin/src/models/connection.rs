//! LucidBot connection and contact aggregates.

use chrono::{DateTime, Utc};

use lucidsync_core::{ConnectionId, UserId};

/// A user's stored LucidBot credential.
///
/// `token_encrypted` is the cipher blob produced by
/// [`TokenCipher`](crate::crypto::TokenCipher); it is never the raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub token_encrypted: Option<String>,
    pub page_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// The encrypted token, if one is stored and non-empty.
    #[must_use]
    pub fn stored_token(&self) -> Option<&str> {
        self.token_encrypted.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether this connection can drive a sync: active with a non-empty token.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.is_active && self.stored_token().is_some()
    }
}

/// Per-user contact counters used by the status listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactStats {
    /// Every mirrored contact.
    pub total: i64,
    /// Contacts with a strictly positive amount owed.
    pub sales: i64,
    /// Most recent `synced_at` across the user's contacts.
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(token: Option<&str>, is_active: bool) -> Connection {
        let now = Utc::now();
        Connection {
            id: ConnectionId::new(1),
            user_id: UserId::new(1),
            token_encrypted: token.map(String::from),
            page_id: Some("page".to_string()),
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        assert!(!connection(Some(""), true).is_usable());
        assert!(!connection(None, true).is_usable());
        assert_eq!(connection(Some(""), true).stored_token(), None);
    }

    #[test]
    fn test_inactive_connection_is_not_usable() {
        assert!(!connection(Some("blob"), false).is_usable());
        assert!(connection(Some("blob"), true).is_usable());
    }
}
