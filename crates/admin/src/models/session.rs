//! Session-stored caller identity.

use serde::{Deserialize, Serialize};

use lucidsync_core::{Email, UserId};

/// The logged-in caller, as written to the session by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub is_admin: bool,
}

/// Session keys shared with the identity service.
pub mod keys {
    /// Key for the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
