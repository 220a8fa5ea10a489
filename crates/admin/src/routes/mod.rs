//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Liveness
//! GET    /health/ready                     - Readiness (store ping)
//!
//! # Sync administration (admin only)
//! GET    /api/admin/users                  - Sync status of every active user
//! POST   /api/admin/set-token              - Validate and store credentials
//! POST   /api/admin/sync-user              - Schedule one user's sync
//! POST   /api/admin/sync-all               - Schedule every eligible user
//! DELETE /api/admin/clear-contacts/{id}    - Delete a user's mirrored contacts
//! ```

pub mod health;
pub mod sync_admin;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router (without session or tracing layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/admin", sync_admin::router())
}
