//! User identity records.
//!
//! Users belong to the identity subsystem. This crate only reads them.

use lucidsync_core::{Email, UserId};

/// A platform user (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    /// Display name, when the user set one.
    pub name: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
}
