//! Per-request headers
//!
//! Every service behind the API router accepts the same set of identity and
//! concurrency headers. [`RequestHeaders`] collects them for one call.

use reqwest::header::{AUTHORIZATION, IF_MATCH};
use reqwest::RequestBuilder;

/// Header carrying the user's auth token
pub const USER_AUTH_HEADER: &str = "X-Florence-Token";

/// Header carrying the collection a change belongs to
pub const COLLECTION_ID_HEADER: &str = "Collection-Id";

const BEARER_PREFIX: &str = "Bearer ";

/// Headers attached to a single request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    /// User auth token
    pub user_auth_token: Option<String>,
    /// Service auth token, overriding the client's configured token
    pub service_auth_token: Option<String>,
    /// Collection ID for changes made in a publishing collection
    pub collection_id: Option<String>,
    /// Expected `ETag` of the resource, sent as `If-Match`
    pub if_match: Option<String>,
}

impl RequestHeaders {
    /// Create an empty header set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to set the user auth token
    #[must_use]
    pub fn with_user_auth_token(mut self, token: impl Into<String>) -> Self {
        self.user_auth_token = Some(token.into());
        self
    }

    /// Builder-style method to set the service auth token
    #[must_use]
    pub fn with_service_auth_token(mut self, token: impl Into<String>) -> Self {
        self.service_auth_token = Some(token.into());
        self
    }

    /// Builder-style method to set the collection ID
    #[must_use]
    pub fn with_collection_id(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    /// Builder-style method to set the expected `ETag`
    #[must_use]
    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    /// Copy of these headers expecting a different `ETag`
    #[must_use]
    pub fn expecting(&self, etag: Option<String>) -> Self {
        Self {
            if_match: etag,
            ..self.clone()
        }
    }

    /// Attach the headers to a request
    ///
    /// `default_service_token` is used when no service token was set here.
    pub(crate) fn apply(
        &self,
        mut request: RequestBuilder,
        default_service_token: Option<&str>,
    ) -> RequestBuilder {
        if let Some(token) = self.service_auth_token.as_deref().or(default_service_token) {
            request = request.header(AUTHORIZATION, bearer(token));
        }
        if let Some(ref token) = self.user_auth_token {
            request = request.header(USER_AUTH_HEADER, token);
        }
        if let Some(ref collection_id) = self.collection_id {
            request = request.header(COLLECTION_ID_HEADER, collection_id);
        }
        if let Some(ref etag) = self.if_match {
            request = request.header(IF_MATCH, etag);
        }
        request
    }
}

fn bearer(token: &str) -> String {
    if token.starts_with(BEARER_PREFIX) {
        token.to_string()
    } else {
        format!("{BEARER_PREFIX}{token}")
    }
}
