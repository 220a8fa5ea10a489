//! Business logic services for admin.
//!
//! # Services
//!
//! - `sync_admin` - LucidBot credential management, sync scheduling and
//!   contact purging

pub mod sync_admin;

pub use sync_admin::{ContactsCleared, SyncAdminError, SyncAdminService, TokenSet};
