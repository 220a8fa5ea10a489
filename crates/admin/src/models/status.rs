//! Status view returned by `GET /api/admin/users`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lucidsync_core::{Email, UserId};

/// One user's LucidBot sync status.
///
/// Field names match the admin frontend's expectations.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserStatus {
    pub user_id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub has_jwt_token: bool,
    pub page_id: Option<String>,
    /// Decoded `expire` claim; display only, never verified.
    pub token_expires: Option<DateTime<Utc>>,
    pub total_contacts: i64,
    pub total_ventas: i64,
    pub last_sync: Option<DateTime<Utc>>,
}
