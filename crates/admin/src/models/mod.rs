//! Domain models for the sync admin surface.

pub mod connection;
pub mod session;
pub mod status;
pub mod user;

pub use connection::{Connection, ContactStats};
pub use session::{CurrentUser, keys as session_keys};
pub use status::UserStatus;
pub use user::User;
