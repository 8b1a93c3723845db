//! Filter API endpoints
//!
//! A filter's dimension options are read page by page like dataset options,
//! but every read reports the filter's `ETag` and every write must present
//! it. Writes are split into chunks that each send the `ETag` returned by the
//! chunk before, so a concurrent change to the filter fails the next chunk
//! instead of being overwritten.

use crate::client::DpClient;
use crate::error::{ApiError, ApiResult};
use crate::headers::RequestHeaders;
use crate::models::{collect, Page, PageCollector, PageParams, Versioned};
use dp_core::batch::{process_in_batches, process_in_concurrent_batches, BatchConfig, FetchedPage};
use dp_core::ChunkError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use tracing::{debug, instrument};

/// JSON-Patch path that appends to a dimension's option list
const OPTIONS_PATCH_PATH: &str = "/options/-";

/// Filter API interface
#[derive(Clone)]
pub struct FilterApi {
    client: DpClient,
}

impl FilterApi {
    /// Create a new filter API interface
    pub(crate) fn new(client: DpClient) -> Self {
        Self { client }
    }

    /// Get one page of the options selected for a filter dimension
    ///
    /// GET /filters/{id}/dimensions/{dimension}/options
    pub async fn get_dimension_options(
        &self,
        headers: &RequestHeaders,
        filter_id: &str,
        dimension: &str,
        params: PageParams,
    ) -> ApiResult<Versioned<Page<FilterOption>>> {
        let path = format!(
            "filters/{filter_id}/dimensions/{dimension}/options?{}",
            params.query()
        );
        self.client.get(&path, headers).await
    }

    /// Page through every selected option, handing each page and its `ETag` to `processor`
    ///
    /// With [`BatchConfig::validate_token`] set, a page whose `ETag` differs
    /// from the first page's fails the run with [`ApiError::ETagMismatch`].
    pub async fn get_dimension_options_batch_process<F>(
        &self,
        headers: &RequestHeaders,
        filter_id: &str,
        dimension: &str,
        config: &BatchConfig,
        processor: F,
    ) -> ApiResult<Option<String>>
    where
        F: FnMut(Page<FilterOption>, Option<&str>) -> ApiResult<ControlFlow<()>>,
    {
        let limit = config.page_size.get();
        let etag = process_in_concurrent_batches(
            |offset| async move {
                let page = self
                    .get_dimension_options(
                        headers,
                        filter_id,
                        dimension,
                        PageParams::new(offset, limit),
                    )
                    .await?;
                let total_count = page.body.total_count;
                Ok::<_, ApiError>(FetchedPage {
                    page: page.body,
                    total_count,
                    token: page.etag,
                })
            },
            processor,
            config,
        )
        .await?;
        Ok(etag)
    }

    /// Fetch every selected option as a single page, with the filter's `ETag`
    pub async fn get_dimension_options_in_batches(
        &self,
        headers: &RequestHeaders,
        filter_id: &str,
        dimension: &str,
        config: &BatchConfig,
    ) -> ApiResult<Versioned<Page<FilterOption>>> {
        let mut collector = None;
        let etag = self
            .get_dimension_options_batch_process(headers, filter_id, dimension, config, |page, _| {
                collect(&mut collector, page)?;
                Ok(ControlFlow::Continue(()))
            })
            .await?;

        Ok(Versioned {
            body: collector.map_or_else(|| Page::complete(Vec::new()), PageCollector::finish),
            etag,
        })
    }

    /// Add and remove options of a filter dimension in chunks of `batch_size`
    ///
    /// PATCH /filters/{id}/dimensions/{dimension}
    ///
    /// Additions go first, then removals. The first request sends the
    /// `If-Match` from `headers` and each later one sends the `ETag` returned
    /// by the request before it. Returns the `ETag` after the last request,
    /// or the one from `headers` if there was nothing to send.
    ///
    /// # Errors
    ///
    /// Stops at the first failing request and returns
    /// [`ApiError::PartialPatch`] with the number of requests that succeeded.
    #[instrument(skip(self, headers, add, remove), fields(add = add.len(), remove = remove.len()))]
    pub async fn patch_dimension_values(
        &self,
        headers: &RequestHeaders,
        filter_id: &str,
        dimension: &str,
        add: &[String],
        remove: &[String],
        batch_size: NonZeroUsize,
    ) -> ApiResult<Option<String>> {
        let path = format!("filters/{filter_id}/dimensions/{dimension}");
        let path = path.as_str();

        let added = process_in_batches(add, batch_size, headers.if_match.clone(), move |etag, chunk| {
            self.patch_chunk(headers, path, PatchOp::Add, etag, chunk)
        })
        .await?;

        let removed = process_in_batches(remove, batch_size, added.state, move |etag, chunk| {
            self.patch_chunk(headers, path, PatchOp::Remove, etag, chunk)
        })
        .await
        .map_err(|err| ChunkError {
            completed: added.chunks + err.completed,
            source: err.source,
        })?;

        debug!(
            requests = added.chunks + removed.chunks,
            "filter dimension patched"
        );
        Ok(removed.state)
    }

    async fn patch_chunk(
        &self,
        headers: &RequestHeaders,
        path: &str,
        op: PatchOp,
        etag: Option<String>,
        values: &[String],
    ) -> ApiResult<Option<String>> {
        let body = [PatchOperation::options(op, values.to_vec())];
        self.client
            .patch(path, &headers.expecting(etag), &body)
            .await
    }
}

/// One option selected for a filter dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    /// Option code
    pub option: String,
    /// Links to related resources
    #[serde(default)]
    pub links: Option<FilterOptionLinks>,
}

/// Links attached to a filter option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptionLinks {
    /// The option itself
    #[serde(rename = "self")]
    pub self_link: Option<FilterLink>,
    /// The filter the option belongs to
    pub filter: Option<FilterLink>,
    /// The dimension the option belongs to
    pub dimension: Option<FilterLink>,
}

/// A hyperlink to another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterLink {
    /// Resource ID
    pub id: Option<String>,
    /// Resource URL
    pub href: String,
}

/// JSON-Patch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add values
    Add,
    /// Remove values
    Remove,
}

/// One JSON-Patch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation kind
    pub op: PatchOp,
    /// Target path
    pub path: String,
    /// Values to add or remove
    pub value: Vec<String>,
}

impl PatchOperation {
    /// An operation on a dimension's option list
    #[must_use]
    pub fn options(op: PatchOp, value: Vec<String>) -> Self {
        Self {
            op,
            path: OPTIONS_PATCH_PATH.to_string(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OPTIONS_PATH: &str = "/filters/f1/dimensions/geography/options";
    const DIMENSION_PATH: &str = "/filters/f1/dimensions/geography";

    fn filters(server: &MockServer) -> FilterApi {
        let config = ClientConfig::default().with_api_router_url(server.uri());
        DpClient::with_config(config).unwrap().filters()
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn page_body(offset: usize, limit: usize, total: usize) -> serde_json::Value {
        let end = (offset + limit).min(total);
        let items: Vec<_> = (offset..end)
            .map(|i| serde_json::json!({"option": format!("K{i:04}")}))
            .collect();
        serde_json::json!({
            "items": items,
            "count": end - offset,
            "offset": offset,
            "limit": limit,
            "total_count": total,
        })
    }

    async fn mount_page(server: &MockServer, offset: usize, limit: usize, total: usize, etag: &str) {
        Mock::given(method("GET"))
            .and(path(OPTIONS_PATH))
            .and(query_param("offset", offset.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", etag)
                    .set_body_json(page_body(offset, limit, total)),
            )
            .mount(server)
            .await;
    }

    fn patch_body(op: &str, values: &[&str]) -> serde_json::Value {
        serde_json::json!([{"op": op, "path": "/options/-", "value": values}])
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_patch_operation_serialization() {
        let op = PatchOperation::options(PatchOp::Remove, strings(&["a", "b"]));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            serde_json::json!({"op": "remove", "path": "/options/-", "value": ["a", "b"]})
        );
    }

    #[test]
    fn test_filter_option_deserialize() {
        let json = r#"{
            "option": "E09000030",
            "links": {
                "self": {"id": "E09000030", "href": "http://localhost/filters/f1/dimensions/geography/options/E09000030"},
                "filter": {"id": "f1", "href": "http://localhost/filters/f1"},
                "dimension": null
            }
        }"#;

        let option: FilterOption = serde_json::from_str(json).unwrap();
        assert_eq!(option.option, "E09000030");
        let links = option.links.unwrap();
        assert_eq!(links.self_link.unwrap().id.as_deref(), Some("E09000030"));
        assert!(links.dimension.is_none());
    }

    #[tokio::test]
    async fn test_in_batches_returns_options_and_etag() {
        let server = MockServer::start().await;
        for offset in [0, 3, 6] {
            mount_page(&server, offset, 3, 7, "e1").await;
        }

        let config = BatchConfig::new(nz(3), nz(2)).with_token_validation(true);
        let result = filters(&server)
            .get_dimension_options_in_batches(&RequestHeaders::new(), "f1", "geography", &config)
            .await
            .unwrap();

        assert_eq!(result.etag.as_deref(), Some("e1"));
        let options: Vec<_> = result.body.items.iter().map(|o| o.option.as_str()).collect();
        assert_eq!(
            options,
            ["K0000", "K0001", "K0002", "K0003", "K0004", "K0005", "K0006"]
        );
    }

    #[tokio::test]
    async fn test_etag_change_is_reported_when_validating() {
        let server = MockServer::start().await;
        mount_page(&server, 0, 2, 4, "e1").await;
        mount_page(&server, 2, 2, 4, "e2").await;

        let config = BatchConfig::new(nz(2), nz(1)).with_token_validation(true);
        let mut seen = Vec::new();
        let err = filters(&server)
            .get_dimension_options_batch_process(
                &RequestHeaders::new(),
                "f1",
                "geography",
                &config,
                |page, etag| {
                    seen.push((page.offset, etag.map(ToString::to_string)));
                    Ok(ControlFlow::Continue(()))
                },
            )
            .await
            .unwrap_err();

        match err {
            ApiError::ETagMismatch { expected, actual } => {
                assert_eq!(expected.as_deref(), Some("e1"));
                assert_eq!(actual.as_deref(), Some("e2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(seen, vec![(0, Some("e1".to_string()))]);
    }

    #[tokio::test]
    async fn test_etag_change_ignored_without_validation() {
        let server = MockServer::start().await;
        mount_page(&server, 0, 2, 4, "e1").await;
        mount_page(&server, 2, 2, 4, "e2").await;

        let config = BatchConfig::new(nz(2), nz(1));
        let result = filters(&server)
            .get_dimension_options_in_batches(&RequestHeaders::new(), "f1", "geography", &config)
            .await
            .unwrap();

        assert_eq!(result.body.count, 4);
        assert_eq!(result.etag.as_deref(), Some("e2"));
    }

    #[tokio::test]
    async fn test_patch_chains_etags_adds_before_removes() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path(DIMENSION_PATH))
            .and(header("If-Match", "e0"))
            .and(body_json(patch_body("add", &["a", "b"])))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "e1"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(DIMENSION_PATH))
            .and(header("If-Match", "e1"))
            .and(body_json(patch_body("add", &["c"])))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "e2"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(DIMENSION_PATH))
            .and(header("If-Match", "e2"))
            .and(body_json(patch_body("remove", &["x"])))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "e3"))
            .expect(1)
            .mount(&server)
            .await;

        let etag = filters(&server)
            .patch_dimension_values(
                &RequestHeaders::new().with_if_match("e0"),
                "f1",
                "geography",
                &strings(&["a", "b", "c"]),
                &strings(&["x"]),
                nz(2),
            )
            .await
            .unwrap();

        assert_eq!(etag.as_deref(), Some("e3"));
    }

    #[tokio::test]
    async fn test_patch_with_nothing_to_send_keeps_etag() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let etag = filters(&server)
            .patch_dimension_values(
                &RequestHeaders::new().with_if_match("e0"),
                "f1",
                "geography",
                &[],
                &[],
                nz(5),
            )
            .await
            .unwrap();

        assert_eq!(etag.as_deref(), Some("e0"));
    }

    #[tokio::test]
    async fn test_patch_failure_counts_completed_requests() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path(DIMENSION_PATH))
            .and(header("If-Match", "e0"))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "e1"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(DIMENSION_PATH))
            .and(header("If-Match", "e1"))
            .respond_with(ResponseTemplate::new(412).set_body_string("etag mismatch"))
            .expect(1)
            .mount(&server)
            .await;

        let err = filters(&server)
            .patch_dimension_values(
                &RequestHeaders::new().with_if_match("e0"),
                "f1",
                "geography",
                &strings(&["a"]),
                &strings(&["x", "y", "z"]),
                nz(1),
            )
            .await
            .unwrap_err();

        match &err {
            ApiError::PartialPatch { completed, source } => {
                assert_eq!(*completed, 1);
                assert_eq!(source.status(), Some(412));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_conflict());
    }
}
