//! API client for the bidcollab backend.
//!
//! Only the authentication endpoints are modelled. Other endpoints go through
//! `get_json`, which attaches the bearer token and reports a rejected token as
//! `ApiError::Unauthorized`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Every backend endpoint lives under this prefix
const API_PREFIX: &str = "/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (without the `/api` suffix).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    #[cfg(test)]
    fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let path = path.strip_prefix("api/").unwrap_or(path);
        format!("{}{}/{}", self.base_url, API_PREFIX, path)
    }

    /// `POST /api/auth/login`
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        self.authenticate("auth/login", username, password).await
    }

    /// `POST /api/auth/register`; the backend signs the new user in directly.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthResponse> {
        self.authenticate("auth/register", username, password).await
    }

    async fn authenticate(&self, endpoint: &str, username: &str, password: &str) -> Result<AuthResponse> {
        let url = self.url(endpoint);
        debug!(%url, username, "Authenticating");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&Credentials { username, password })
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .context("Failed to parse auth response")?;

        if auth.token.is_empty() {
            return Err(ApiError::InvalidResponse("empty token in auth response".to_string()).into());
        }

        Ok(auth)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Authenticated GET of `/api/<path>`, retrying on 429 with exponential backoff.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(%url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_error(err: &anyhow::Error) -> &ApiError {
        err.downcast_ref::<ApiError>().expect("error should carry an ApiError")
    }

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.url("auth/login"), "http://localhost:8080/api/auth/login");
        assert_eq!(client.url("/projects"), "http://localhost:8080/api/projects");
        assert_eq!(client.url("/api/projects/3"), "http://localhost:8080/api/projects/3");
    }

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"token": "eyJhbGciOiJIUzI1NiJ9.e30.sig", "username": "alice"}"#;
        let auth: AuthResponse = serde_json::from_str(json).expect("Failed to parse auth test JSON");
        assert_eq!(auth.username, "alice");
        assert!(auth.token.starts_with("eyJ"));
    }

    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(serde_json::json!({"username": "alice", "password": "s3cret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "abc123",
                "username": "alice"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let auth = client.login("alice", "s3cret").await.expect("login");
        assert_eq!(auth, AuthResponse { token: "abc123".to_string(), username: "alice".to_string() });
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.login("alice", "wrong").await.unwrap_err();
        assert!(api_error(&err).is_unauthorized());
    }

    #[tokio::test]
    async fn test_login_empty_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "",
                "username": "alice"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.login("alice", "s3cret").await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(400).set_body_string("username already exists"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.register("alice", "s3cret").await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::BadRequest(body) if body.contains("exists")));
    }

    #[tokio::test]
    async fn test_get_json_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .and(header_eq("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 1}])))
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&server.uri()).unwrap();
        client.set_token("abc123".to_string());
        let projects: serde_json::Value = client.get_json("/projects").await.expect("projects");
        assert_eq!(projects[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_get_json_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.get_json::<serde_json::Value>("/projects").await.unwrap_err();
        assert!(api_error(&err).is_unauthorized());
    }

    #[tokio::test]
    async fn test_get_json_gives_up_after_rate_limit_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(429))
            .expect(u64::from(MAX_RATE_LIMIT_RETRIES) + 1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())
            .unwrap()
            .with_initial_backoff(Duration::from_millis(1));
        let err = client.get_json::<serde_json::Value>("/projects").await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::RateLimited));
    }
}
