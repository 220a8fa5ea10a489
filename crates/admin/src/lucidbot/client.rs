//! LucidBot panel HTTP client.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{LucidbotError, TokenValidation, TokenValidator};
use crate::config::LucidbotConfig;

/// Path of the panel's user-listing endpoint, relative to the base URL.
const USER_ENDPOINT: &str = "php/user.php";

/// Request body for the user-listing query.
///
/// Asks for a single record sorted by date; only `recordsTotal` matters.
#[derive(Debug, Serialize)]
struct UserListQuery<'a> {
    op: &'static str,
    op1: &'static str,
    cdts: [(); 0],
    oprt: u8,
    search_text: &'static str,
    datatable: DataTable,
    #[serde(rename = "pageName")]
    page_name: &'static str,
    page_id: &'a str,
}

#[derive(Debug, Serialize)]
struct DataTable {
    draw: u32,
    start: u32,
    length: u32,
    #[serde(rename = "orderByName")]
    order_by_name: [OrderBy; 1],
}

#[derive(Debug, Serialize)]
struct OrderBy {
    column: OrderColumn,
    dir: &'static str,
}

#[derive(Debug, Serialize)]
struct OrderColumn {
    name: &'static str,
}

impl<'a> UserListQuery<'a> {
    const fn single_record(page_id: &'a str) -> Self {
        Self {
            op: "users",
            op1: "get",
            cdts: [],
            oprt: 1,
            search_text: "",
            datatable: DataTable {
                draw: 1,
                start: 0,
                length: 1,
                order_by_name: [OrderBy {
                    column: OrderColumn { name: "dt" },
                    dir: "desc",
                }],
            },
            page_name: "users",
            page_id,
        }
    }
}

/// Response envelope of the user-listing endpoint.
#[derive(Debug, Deserialize)]
struct UserListResponse {
    status: Option<String>,
    #[serde(rename = "recordsTotal", default)]
    records_total: Option<i64>,
}

/// HTTP client for the LucidBot panel.
#[derive(Debug, Clone)]
pub struct LucidbotClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl LucidbotClient {
    /// Create a client for the configured panel.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the endpoint
    /// URL cannot be derived from the base URL.
    pub fn new(config: &LucidbotConfig) -> Result<Self, LucidbotError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint_url(&config.base_url)?,
        })
    }

    /// Ask the panel for one user record using the candidate credentials.
    ///
    /// Returns the remote `recordsTotal` when the token is accepted.
    ///
    /// # Errors
    ///
    /// Returns `LucidbotError::Status` for non-200 responses,
    /// `LucidbotError::Rejected` when the body does not say `OK`, and
    /// `LucidbotError::Http` for transport or decode failures.
    #[instrument(skip(self, token), fields(page_id = %page_id))]
    pub async fn fetch_total_contacts(
        &self,
        token: &str,
        page_id: &str,
    ) -> Result<i64, LucidbotError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("token={token}; last_page_id={page_id}"))
            .json(&UserListQuery::single_record(page_id))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(LucidbotError::Status(status.as_u16()));
        }

        let body: UserListResponse = response.json().await?;
        if body.status.as_deref() != Some("OK") {
            return Err(LucidbotError::Rejected);
        }

        let total = body.records_total.unwrap_or(0);
        debug!(total, "LucidBot accepted token");
        Ok(total)
    }
}

#[async_trait]
impl TokenValidator for LucidbotClient {
    async fn validate(&self, token: &str, page_id: &str) -> TokenValidation {
        match self.fetch_total_contacts(token, page_id).await {
            Ok(total) => TokenValidation::accepted(total),
            Err(e) => {
                warn!(error = %e, page_id = %page_id, "LucidBot token validation failed");
                TokenValidation::rejected(e.to_string())
            }
        }
    }
}

/// Resolve the user endpoint against the base, keeping any base path.
fn endpoint_url(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(USER_ENDPOINT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> LucidbotClient {
        LucidbotClient::new(&LucidbotConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let root = Url::parse("https://panel.lucidbot.co").unwrap();
        assert_eq!(
            endpoint_url(&root).unwrap().as_str(),
            "https://panel.lucidbot.co/php/user.php"
        );

        let nested = Url::parse("http://proxy.local/lucid").unwrap();
        assert_eq!(
            endpoint_url(&nested).unwrap().as_str(),
            "http://proxy.local/lucid/php/user.php"
        );
    }

    #[test]
    fn test_query_shape() {
        let json = serde_json::to_value(UserListQuery::single_record("pg-7")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "op": "users",
                "op1": "get",
                "cdts": [],
                "oprt": 1,
                "search_text": "",
                "datatable": {
                    "draw": 1,
                    "start": 0,
                    "length": 1,
                    "orderByName": [{"column": {"name": "dt"}, "dir": "desc"}]
                },
                "pageName": "users",
                "page_id": "pg-7"
            })
        );
    }

    #[tokio::test]
    async fn test_validate_accepts_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/php/user.php"))
            .and(header("cookie", "token=tok-1; last_page_id=pg-7"))
            .and(body_json(UserListQuery::single_record("pg-7")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "OK", "recordsTotal": 812})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).validate("tok-1", "pg-7").await;
        assert_eq!(result, TokenValidation::accepted(812));
    }

    #[tokio::test]
    async fn test_validate_defaults_missing_total_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "OK"})))
            .mount(&server)
            .await;

        let result = client_for(&server).validate("tok", "pg").await;
        assert_eq!(result.total_contacts, Some(0));
    }

    #[tokio::test]
    async fn test_validate_rejects_non_ok_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ERROR"})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).validate("tok", "pg").await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("Token invalid or expired"));
    }

    #[tokio::test]
    async fn test_validate_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).validate("tok", "pg").await;
        assert_eq!(result, TokenValidation::rejected("HTTP 401"));
    }

    #[tokio::test]
    async fn test_validate_folds_transport_errors() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        drop(server);

        let result = client.validate("tok", "pg").await;
        assert!(!result.ok);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_validate_folds_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).validate("tok", "pg").await;
        assert!(!result.ok);
    }
}
