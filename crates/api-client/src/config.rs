//! Configuration for the dp API client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{ApiError, ApiResult};
use dp_core::BatchConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default production API router URL
const DEFAULT_API_ROUTER_URL: &str = "https://api.beta.ons.gov.uk/v1";

/// API router URL of a locally running stack
const DEVELOPMENT_API_ROUTER_URL: &str = "http://localhost:23200/v1";

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development against a locally running API router
    Development,
    /// Production environment
    #[default]
    Production,
}

impl Environment {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match env::var("DP_ENV")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "development" | "dev" | "local" => Self::Development,
            _ => Self::Production,
        }
    }

    fn default_api_router_url(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_API_ROUTER_URL,
            Self::Production => DEFAULT_API_ROUTER_URL,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API router every service is reached through
    pub api_router_url: String,
    /// Service auth token sent as a bearer token when a request doesn't set one
    pub service_auth_token: Option<String>,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Paging settings for batched fetches
    pub batch: BatchConfig,
    /// Current environment
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_router_url: DEFAULT_API_ROUTER_URL.to_string(),
            service_auth_token: None,
            timeout: Duration::from_secs(30),
            batch: BatchConfig::default(),
            environment: Environment::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `DP_ENV`: Environment (development/production)
    /// - `DP_API_ROUTER_URL`: Base URL of the API router
    /// - `DP_SERVICE_AUTH_TOKEN`: Service auth token
    /// - `DP_TIMEOUT_SECS`: Request timeout in seconds
    /// - `DP_BATCH_SIZE`: Items requested per page in batched fetches
    /// - `DP_BATCH_MAX_WORKERS`: Pages fetched at once in batched fetches
    /// - `DP_BATCH_VALIDATE_ETAG`: Fail batched fetches if the `ETag` changes
    pub fn from_env() -> ApiResult<Self> {
        let environment = Environment::from_env();

        let api_router_url = env::var("DP_API_ROUTER_URL")
            .unwrap_or_else(|_| environment.default_api_router_url().to_string());

        let service_auth_token = env::var("DP_SERVICE_AUTH_TOKEN").ok();

        let timeout = env::var("DP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(30), Duration::from_secs);

        let mut batch = BatchConfig::default();
        if let Some(page_size) = non_zero_var("DP_BATCH_SIZE")? {
            batch = batch.with_page_size(page_size);
        }
        if let Some(max_workers) = non_zero_var("DP_BATCH_MAX_WORKERS")? {
            batch = batch.with_max_workers(max_workers);
        }
        if let Ok(validate) = env::var("DP_BATCH_VALIDATE_ETAG") {
            batch = batch.with_token_validation(matches!(
                validate.to_lowercase().as_str(),
                "1" | "true" | "yes"
            ));
        }

        Ok(Self {
            api_router_url,
            service_auth_token,
            timeout,
            batch,
            environment,
        })
    }

    /// Create development configuration (local API router)
    #[must_use]
    pub fn development() -> Self {
        Self {
            api_router_url: DEVELOPMENT_API_ROUTER_URL.to_string(),
            service_auth_token: env::var("DP_SERVICE_AUTH_TOKEN").ok(),
            timeout: Duration::from_secs(10),
            batch: BatchConfig::default(),
            environment: Environment::Development,
        }
    }

    /// Create production configuration
    #[must_use]
    pub fn production() -> Self {
        Self {
            api_router_url: DEFAULT_API_ROUTER_URL.to_string(),
            service_auth_token: env::var("DP_SERVICE_AUTH_TOKEN").ok(),
            timeout: Duration::from_secs(30),
            batch: BatchConfig::default(),
            environment: Environment::Production,
        }
    }

    /// Builder-style method to set the API router URL
    #[must_use]
    pub fn with_api_router_url(mut self, url: impl Into<String>) -> Self {
        self.api_router_url = url.into();
        self
    }

    /// Builder-style method to set the service auth token
    #[must_use]
    pub fn with_service_auth_token(mut self, token: impl Into<String>) -> Self {
        self.service_auth_token = Some(token.into());
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set batch paging settings
    #[must_use]
    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.api_router_url.is_empty() {
            return Err(ApiError::config("api_router_url cannot be empty"));
        }

        if !self.api_router_url.starts_with("http://")
            && !self.api_router_url.starts_with("https://")
        {
            return Err(ApiError::InvalidUrl(format!(
                "{} (must start with http:// or https://)",
                self.api_router_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        Ok(())
    }
}

/// Read an optional positive integer from the environment
fn non_zero_var(name: &str) -> ApiResult<Option<NonZeroUsize>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<NonZeroUsize>()
            .map(Some)
            .map_err(|_| ApiError::config(format!("{name} must be a positive integer, got {value:?}"))),
        Err(_) => Ok(None),
    }
}
