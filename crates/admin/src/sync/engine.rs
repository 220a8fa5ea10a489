//! HTTP forwarder to the external sync service.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use lucidsync_core::UserId;

use super::{SyncEngine, SyncJob};

const SYNC_PATH: &str = "sync";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from forwarding a job to the sync service.
#[derive(Debug, Error)]
pub enum SyncEngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sync service returned HTTP {0}")]
    Status(u16),

    #[error("invalid sync service URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    user_id: UserId,
    token: &'a str,
    page_id: &'a str,
}

/// Forwards jobs as `POST {base}/sync`.
#[derive(Debug, Clone)]
pub struct HttpSyncEngine {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSyncEngine {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the endpoint
    /// cannot be derived from `base_url`.
    pub fn new(base_url: &Url) -> Result<Self, SyncEngineError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            endpoint: base.join(SYNC_PATH)?,
        })
    }
}

#[async_trait]
impl SyncEngine for HttpSyncEngine {
    #[instrument(skip(self, job), fields(user_id = %job.user_id))]
    async fn run(&self, job: SyncJob) -> Result<(), SyncEngineError> {
        let body = SyncRequest {
            user_id: job.user_id,
            token: job.token.expose_secret(),
            page_id: &job.page_id,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncEngineError::Status(status.as_u16()));
        }

        debug!(status = status.as_u16(), "Sync service accepted job");
        Ok(())
    }
}
