//! Integration test support for LucidSync.
//!
//! Builds the admin router over the in-memory store with a scripted token
//! validator and an observable sync queue, so the full HTTP surface can be
//! driven with `tower::ServiceExt::oneshot` and no external services.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lucidsync-integration-tests
//! ```
//!
//! # Caller identity
//!
//! The identity service is out of process. Tests impersonate it by sending a
//! [`CurrentUser`] as JSON in the [`TEST_IDENTITY_HEADER`]; a middleware
//! stores it in the session before the handlers run.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use secrecy::SecretString;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_sessions::Session;

use lucidsync_admin::crypto::TokenCipher;
use lucidsync_admin::db::MemoryStore;
use lucidsync_admin::lucidbot::{TokenValidation, TokenValidator};
use lucidsync_admin::middleware::{session_layer, set_current_user};
use lucidsync_admin::models::{CurrentUser, User};
use lucidsync_admin::routes;
use lucidsync_admin::services::SyncAdminService;
use lucidsync_admin::state::AppState;
use lucidsync_admin::sync::{SyncDispatcher, SyncJob};
use lucidsync_core::{Email, UserId};

/// Fixed 32-byte key used by every test cipher.
pub const TEST_KEY: &str = "q3J9vX0bLk2mT8wZr5Yc1HfN7uGd4Ea6Ps0Qi9Oj2Bs=";

/// Header carrying the impersonated caller as JSON.
pub const TEST_IDENTITY_HEADER: &str = "x-test-identity";

/// Build the test cipher.
#[must_use]
pub fn test_cipher() -> TokenCipher {
    TokenCipher::from_base64_key(&SecretString::from(TEST_KEY.to_string())).unwrap()
}

/// Validator returning a fixed answer and counting calls.
pub struct ScriptedValidator {
    answer: TokenValidation,
    calls: AtomicUsize,
}

impl ScriptedValidator {
    #[must_use]
    pub fn new(answer: TokenValidation) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenValidator for ScriptedValidator {
    async fn validate(&self, _token: &str, _page_id: &str) -> TokenValidation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// A fully wired admin app over in-memory state.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub cipher: TokenCipher,
    pub validator: Arc<ScriptedValidator>,
    pub jobs: mpsc::Receiver<SyncJob>,
}

impl TestApp {
    /// Build an app whose validator always gives `answer`.
    #[must_use]
    pub fn new(answer: TokenValidation) -> Self {
        Self::with_validator(ScriptedValidator::new(answer))
    }

    #[must_use]
    pub fn with_validator(validator: Arc<ScriptedValidator>) -> Self {
        let store = MemoryStore::new();
        let cipher = test_cipher();
        let (dispatcher, jobs) = SyncDispatcher::channel(64);

        let service = SyncAdminService::new(
            Arc::new(store.clone()),
            validator.clone(),
            cipher.clone(),
            dispatcher,
        );

        let router = routes::routes()
            .layer(from_fn(impersonate))
            .layer(session_layer(tower_sessions::MemoryStore::default(), false))
            .with_state(AppState::new(service));

        Self {
            router,
            store,
            cipher,
            validator,
            jobs,
        }
    }

    /// Send a request and return the status with the JSON body (`Null` when
    /// the body is empty or not JSON).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Store an encrypted token for `user_id` directly.
    pub async fn seed_connection(&self, user_id: i64, token: &str, page_id: &str) {
        let blob = self.cipher.encrypt(token).unwrap();
        self.store
            .put_connection(UserId::new(user_id), Some(&blob), Some(page_id), true)
            .await;
    }

    /// Drain and return every queued sync job.
    pub fn drain_jobs(&mut self) -> Vec<SyncJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }
}

/// Copy the identity header into the session, the way the identity service
/// would after login.
async fn impersonate(session: Session, request: Request, next: Next) -> Response {
    let caller = request
        .headers()
        .get(TEST_IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| serde_json::from_str::<CurrentUser>(raw).ok());

    if let Some(caller) = caller {
        set_current_user(&session, &caller).await.unwrap();
    }

    next.run(request).await
}

/// An active user with an `@example.com` address.
#[must_use]
pub fn user(id: i64) -> User {
    User {
        id: UserId::new(id),
        email: Email::parse(&format!("user{id}@example.com")).unwrap(),
        name: Some(format!("User {id}")),
        is_active: true,
        is_admin: false,
    }
}

#[must_use]
pub fn admin_caller() -> CurrentUser {
    CurrentUser {
        id: UserId::new(1000),
        email: Email::parse("ops@example.com").unwrap(),
        name: Some("Ops".to_string()),
        is_admin: true,
    }
}

#[must_use]
pub fn member_caller() -> CurrentUser {
    CurrentUser {
        is_admin: false,
        ..admin_caller()
    }
}

/// Start a request builder carrying `caller` as the session identity.
#[must_use]
pub fn as_caller(
    caller: &CurrentUser,
    method: &str,
    uri: &str,
) -> axum::http::request::Builder {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(TEST_IDENTITY_HEADER, serde_json::to_string(caller).unwrap())
}

/// JSON request from `caller`.
#[must_use]
pub fn json_request(
    caller: &CurrentUser,
    method: &str,
    uri: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    as_caller(caller, method, uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Body-less request from `caller`.
#[must_use]
pub fn empty_request(caller: &CurrentUser, method: &str, uri: &str) -> Request<Body> {
    as_caller(caller, method, uri).body(Body::empty()).unwrap()
}
