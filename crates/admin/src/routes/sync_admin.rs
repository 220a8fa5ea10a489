//! LucidBot sync administration API handlers.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use lucidsync_core::{Email, UserId};

use crate::{
    error::AppError, middleware::RequireAdmin, models::UserStatus, state::AppState,
};

/// Build the sync admin router (mounted under `/api/admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/set-token", post(set_token))
        .route("/sync-user", post(sync_user))
        .route("/sync-all", post(sync_all))
        .route("/clear-contacts/{user_id}", delete(clear_contacts))
}

/// Request for storing a user's LucidBot credentials.
#[derive(Debug, Deserialize)]
pub struct SetTokenRequest {
    pub user_id: UserId,
    #[serde(alias = "jwt_token")]
    pub token: String,
    pub page_id: String,
}

#[derive(Debug, Serialize)]
pub struct SetTokenResponse {
    pub success: bool,
    pub message: String,
    pub total_contacts_in_lucidbot: i64,
}

#[derive(Debug, Deserialize)]
pub struct SyncUserRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct SyncUserResponse {
    pub success: bool,
    pub message: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SyncAllResponse {
    pub success: bool,
    pub message: String,
    pub users: Vec<Email>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Turn axum's body rejection into the API's `{"detail"}` 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Same for path parameters.
fn path<T>(param: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    param
        .map(|Path(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// List every active user's sync status.
///
/// # Errors
///
/// Returns 401/403 for non-admin callers, 500 on storage failures.
pub async fn list_users(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserStatus>>, AppError> {
    let statuses = state.sync_admin().list_status(&admin).await?;
    Ok(Json(statuses))
}

/// Validate and store a user's LucidBot token.
///
/// # Errors
///
/// Returns 400 for malformed bodies or rejected tokens, 404 for unknown users.
pub async fn set_token(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<SetTokenRequest>, JsonRejection>,
) -> Result<Json<SetTokenResponse>, AppError> {
    let req = body(payload)?;
    let outcome = state
        .sync_admin()
        .set_token(&admin, req.user_id, &req.token, &req.page_id)
        .await?;

    Ok(Json(SetTokenResponse {
        success: true,
        message: format!("Token configured for {}", outcome.email),
        total_contacts_in_lucidbot: outcome.total_contacts,
    }))
}

/// Schedule a sync for one user.
///
/// # Errors
///
/// Returns 400 when the user has no stored token, 404 for unknown users.
pub async fn sync_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<SyncUserRequest>, JsonRejection>,
) -> Result<Json<SyncUserResponse>, AppError> {
    let req = body(payload)?;
    let email = state.sync_admin().sync_user(&admin, req.user_id).await?;

    Ok(Json(SyncUserResponse {
        success: true,
        message: format!("Sync started for {email}"),
        status: "processing",
    }))
}

/// Schedule a sync for every user with stored credentials.
///
/// # Errors
///
/// Returns 400 when no user has a stored token.
pub async fn sync_all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<SyncAllResponse>, AppError> {
    let users = state.sync_admin().sync_all(&admin).await?;

    Ok(Json(SyncAllResponse {
        success: true,
        message: format!("Sync started for {} users", users.len()),
        users,
    }))
}

/// Delete every mirrored contact of a user.
///
/// # Errors
///
/// Returns 400 for a non-numeric id, 404 for unknown users.
pub async fn clear_contacts(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = path(user_id)?;
    let cleared = state.sync_admin().clear_contacts(&admin, user_id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: format!("Deleted {} contacts for {}", cleared.deleted, cleared.email),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_token_request_accepts_alias() {
        let req: SetTokenRequest =
            serde_json::from_str(r#"{"user_id":4,"jwt_token":"abc","page_id":"p"}"#).unwrap();
        assert_eq!(req.user_id, UserId::new(4));
        assert_eq!(req.token, "abc");

        let req: SetTokenRequest =
            serde_json::from_str(r#"{"user_id":4,"token":"xyz","page_id":"p"}"#).unwrap();
        assert_eq!(req.token, "xyz");
    }

    #[test]
    fn test_set_token_request_requires_page_id() {
        assert!(serde_json::from_str::<SetTokenRequest>(r#"{"user_id":4,"token":"x"}"#).is_err());
    }
}
