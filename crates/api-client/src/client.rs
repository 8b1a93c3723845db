//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::{DatasetApi, FilterApi};
use crate::error::{ApiError, ApiResult};
use crate::headers::RequestHeaders;
use crate::models::Versioned;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ETAG, USER_AGENT};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn, Span};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// HTTP client for services behind the dp API router
///
/// This client wraps `reqwest` and adds:
/// - Service, user and collection headers on every request
/// - `ETag` capture on reads and `If-Match` on writes
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct DpClient {
    inner: Client,
    config: Arc<ClientConfig>,
}

impl DpClient {
    /// Create a new client with default configuration from environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("dp-api-client/", env!("CARGO_PKG_VERSION"))),
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the API router URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.api_router_url
    }

    // -------------------------------------------------------------------------
    // Service API accessors
    // -------------------------------------------------------------------------

    /// Access dataset API endpoints
    #[must_use]
    pub fn datasets(&self) -> DatasetApi {
        DatasetApi::new(self.clone())
    }

    /// Access filter API endpoints
    #[must_use]
    pub fn filters(&self) -> FilterApi {
        FilterApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Low-level HTTP methods
    // -------------------------------------------------------------------------

    /// Perform a GET request, returning the body and its `ETag`
    #[instrument(skip(self, headers), fields(request_id))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: &RequestHeaders,
    ) -> ApiResult<Versioned<T>> {
        let response = self
            .send(Method::GET, path, headers, Option::<&()>::None)
            .await?;
        let etag = etag_of(&response);
        let body = response.json().await?;
        Ok(Versioned { body, etag })
    }

    /// Perform a PATCH request, returning the resource's new `ETag`
    #[instrument(skip(self, headers, body), fields(request_id))]
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        headers: &RequestHeaders,
        body: &B,
    ) -> ApiResult<Option<String>> {
        let response = self.send(Method::PATCH, path, headers, Some(body)).await?;
        Ok(etag_of(&response))
    }

    /// Build the absolute URL for a path under the API router
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_router_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a request and fail on a non-success status
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        headers: &RequestHeaders,
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let url = self.url_for(path);
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let mut request = self
            .inner
            .request(method.clone(), &url)
            .header(X_REQUEST_ID, &request_id);
        request = headers.apply(request, self.config.service_auth_token.as_deref());

        if let Some(b) = body {
            request = request.json(b);
        }

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let elapsed = start.elapsed();

        if status.is_success() {
            debug!(
                request_id = %request_id,
                method = %method,
                url = %url,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis(),
                "Request succeeded"
            );
            Ok(response)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(
                request_id = %request_id,
                method = %method,
                url = %url,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis(),
                "Request failed"
            );
            Err(ApiError::api_response(status.as_u16(), message))
        }
    }
}

/// Read the `ETag` header from a response
fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Dataset {
        id: String,
    }

    fn client_for(server: &MockServer) -> DpClient {
        let config = ClientConfig::default()
            .with_api_router_url(server.uri())
            .with_service_auth_token("svc-token");
        DpClient::with_config(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = DpClient::with_config(ClientConfig::development());
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClientConfig::default().with_api_router_url("not-a-url");
        assert!(DpClient::with_config(config).is_err());
    }

    #[test]
    fn test_url_for_joins_cleanly() {
        let config = ClientConfig::default().with_api_router_url("http://localhost:23200/v1/");
        let client = DpClient::with_config(config).unwrap();
        assert_eq!(
            client.url_for("/datasets/cpih01"),
            "http://localhost:23200/v1/datasets/cpih01"
        );
    }

    #[tokio::test]
    async fn test_get_returns_body_and_etag() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/datasets/cpih01"))
            .and(header("Authorization", "Bearer svc-token"))
            .and(header("X-Florence-Token", "user-token"))
            .and(header("Collection-Id", "col-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "etag-1")
                    .set_body_json(serde_json::json!({"id": "cpih01"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let headers = RequestHeaders::new()
            .with_user_auth_token("user-token")
            .with_collection_id("col-1");
        let result: Versioned<Dataset> = client_for(&server)
            .get("datasets/cpih01", &headers)
            .await
            .unwrap();

        assert_eq!(result.body.id, "cpih01");
        assert_eq!(result.etag.as_deref(), Some("etag-1"));
    }

    #[tokio::test]
    async fn test_error_status_mapped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/datasets/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("dataset not found"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get::<Dataset>("datasets/missing", &RequestHeaders::new())
            .await
            .unwrap_err();

        match err {
            ApiError::ApiResponse { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "dataset not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_patch_sends_if_match_and_returns_etag() {
        let server = MockServer::start().await;
        let body = serde_json::json!([{"op": "add", "path": "/options/-", "value": ["a"]}]);

        Mock::given(method("PATCH"))
            .and(path("/filters/f1/dimensions/geography"))
            .and(header("If-Match", "etag-1"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "etag-2"))
            .expect(1)
            .mount(&server)
            .await;

        let etag = client_for(&server)
            .patch(
                "filters/f1/dimensions/geography",
                &RequestHeaders::new().with_if_match("etag-1"),
                &body,
            )
            .await
            .unwrap();

        assert_eq!(etag.as_deref(), Some("etag-2"));
    }
}
