//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. `RequireAdmin` extractor on every `/api/admin` handler

pub mod auth;
pub mod session;

pub use auth::{RequireAdmin, set_current_user};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, session_layer};
