//! Dataset API endpoints
//!
//! Maps to the dataset API's dimension option listing:
//! - Get one page of options for a dimension of a dataset version
//! - Fetch every option with concurrent paging
//! - Stream every page through a caller-supplied processor

use crate::client::DpClient;
use crate::error::{ApiError, ApiResult};
use crate::headers::RequestHeaders;
use crate::models::{collect, Page, PageCollector, PageParams, Versioned};
use dp_core::batch::{process_in_concurrent_batches, BatchConfig, FetchedPage};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

/// Dataset API interface
#[derive(Clone)]
pub struct DatasetApi {
    client: DpClient,
}

impl DatasetApi {
    /// Create a new dataset API interface
    pub(crate) fn new(client: DpClient) -> Self {
        Self { client }
    }

    /// Get one page of options for a dimension
    ///
    /// GET /datasets/{id}/editions/{edition}/versions/{version}/dimensions/{dimension}/options
    pub async fn get_options(
        &self,
        headers: &RequestHeaders,
        dimension: &DimensionRef,
        params: PageParams,
    ) -> ApiResult<Versioned<Page<DimensionOption>>> {
        let path = format!("{}?{}", dimension.options_path(), params.query());
        self.client.get(&path, headers).await
    }

    /// Page through every option of a dimension, handing each page to `processor`
    ///
    /// Pages are fetched concurrently as configured by `config` but
    /// `processor` sees them one at a time and in no particular order after
    /// the first. Returning [`ControlFlow::Break`] stops the run early without
    /// an error. Returns the `ETag` of the run; see
    /// [`process_in_concurrent_batches`] for how it is chosen.
    pub async fn get_options_batch_process<F>(
        &self,
        headers: &RequestHeaders,
        dimension: &DimensionRef,
        config: &BatchConfig,
        mut processor: F,
    ) -> ApiResult<Option<String>>
    where
        F: FnMut(Page<DimensionOption>) -> ApiResult<ControlFlow<()>>,
    {
        let limit = config.page_size.get();
        let etag = process_in_concurrent_batches(
            |offset| async move {
                let page = self
                    .get_options(headers, dimension, PageParams::new(offset, limit))
                    .await?;
                let total_count = page.body.total_count;
                Ok::<_, ApiError>(FetchedPage {
                    page: page.body,
                    total_count,
                    token: page.etag,
                })
            },
            |page, _etag| processor(page),
            config,
        )
        .await?;
        Ok(etag)
    }

    /// Fetch every option of a dimension as a single page
    pub async fn get_options_in_batches(
        &self,
        headers: &RequestHeaders,
        dimension: &DimensionRef,
        config: &BatchConfig,
    ) -> ApiResult<Page<DimensionOption>> {
        let mut collector = None;
        self.get_options_batch_process(headers, dimension, config, |page| {
            collect(&mut collector, page)?;
            Ok(ControlFlow::Continue(()))
        })
        .await?;

        Ok(collector.map_or_else(|| Page::complete(Vec::new()), PageCollector::finish))
    }
}

/// Identifies one dimension of one dataset version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRef {
    /// Dataset ID
    pub dataset_id: String,
    /// Edition name
    pub edition: String,
    /// Version number
    pub version: String,
    /// Dimension name
    pub dimension: String,
}

impl DimensionRef {
    /// Create a dimension reference
    pub fn new(
        dataset_id: impl Into<String>,
        edition: impl Into<String>,
        version: impl Into<String>,
        dimension: impl Into<String>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            edition: edition.into(),
            version: version.into(),
            dimension: dimension.into(),
        }
    }

    fn options_path(&self) -> String {
        format!(
            "datasets/{}/editions/{}/versions/{}/dimensions/{}/options",
            self.dataset_id, self.edition, self.version, self.dimension
        )
    }
}

/// One option of a dataset dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionOption {
    /// Dimension the option belongs to
    pub dimension: String,
    /// Human readable label
    pub label: String,
    /// Option code
    pub option: String,
    /// Links to related resources
    #[serde(default)]
    pub links: Option<OptionLinks>,
}

/// Links attached to a dimension option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionLinks {
    /// Code list entry for the option
    pub code: Option<Link>,
    /// Code list the option is drawn from
    pub code_list: Option<Link>,
    /// The dataset version
    pub version: Option<Link>,
}

/// A hyperlink to another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Resource ID
    pub id: Option<String>,
    /// Resource URL
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::num::NonZeroUsize;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OPTIONS_PATH: &str = "/datasets/cpih01/editions/time-series/versions/3/dimensions/aggregate/options";

    fn dimension() -> DimensionRef {
        DimensionRef::new("cpih01", "time-series", "3", "aggregate")
    }

    fn option(code: usize) -> serde_json::Value {
        serde_json::json!({
            "dimension": "aggregate",
            "label": format!("Label {code}"),
            "option": format!("cpih1dim1A{code}"),
        })
    }

    fn page_body(offset: usize, limit: usize, total: usize) -> serde_json::Value {
        let end = (offset + limit).min(total);
        let items: Vec<_> = (offset..end).map(option).collect();
        serde_json::json!({
            "items": items,
            "count": end - offset,
            "offset": offset,
            "limit": limit,
            "total_count": total,
        })
    }

    async fn mount_pages(server: &MockServer, limit: usize, total: usize) {
        let mut offset = 0;
        loop {
            Mock::given(method("GET"))
                .and(path(OPTIONS_PATH))
                .and(query_param("offset", offset.to_string()))
                .and(query_param("limit", limit.to_string()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("ETag", "v1")
                        .set_body_json(page_body(offset, limit, total)),
                )
                .expect(1)
                .mount(server)
                .await;
            offset += limit;
            if offset >= total {
                break;
            }
        }
    }

    fn datasets(server: &MockServer) -> DatasetApi {
        let config = ClientConfig::default().with_api_router_url(server.uri());
        DpClient::with_config(config).unwrap().datasets()
    }

    fn batch(page_size: usize, workers: usize) -> BatchConfig {
        BatchConfig::new(
            NonZeroUsize::new(page_size).unwrap(),
            NonZeroUsize::new(workers).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_get_options_single_page() {
        let server = MockServer::start().await;
        mount_pages(&server, 10, 3).await;

        let page = datasets(&server)
            .get_options(&RequestHeaders::new(), &dimension(), PageParams::new(0, 10))
            .await
            .unwrap();

        assert_eq!(page.etag.as_deref(), Some("v1"));
        assert_eq!(page.body.count, 3);
        assert_eq!(page.body.items[2].option, "cpih1dim1A2");
    }

    #[tokio::test]
    async fn test_get_options_in_batches_reassembles_in_order() {
        let server = MockServer::start().await;
        mount_pages(&server, 4, 17).await;

        let page = datasets(&server)
            .get_options_in_batches(&RequestHeaders::new(), &dimension(), &batch(4, 3))
            .await
            .unwrap();

        assert_eq!(page.total_count, 17);
        assert_eq!(page.count, 17);
        let codes: Vec<_> = page.items.iter().map(|o| o.option.clone()).collect();
        let expected: Vec<_> = (0..17).map(|i| format!("cpih1dim1A{i}")).collect();
        assert_eq!(codes, expected);
    }

    #[tokio::test]
    async fn test_batch_process_can_stop_early() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OPTIONS_PATH))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, 5, 50)))
            .expect(1)
            .mount(&server)
            .await;

        let mut pages = 0;
        let etag = datasets(&server)
            .get_options_batch_process(&RequestHeaders::new(), &dimension(), &batch(5, 2), |_page| {
                pages += 1;
                Ok(ControlFlow::Break(()))
            })
            .await
            .unwrap();

        assert_eq!(pages, 1);
        assert_eq!(etag, None);
    }

    #[tokio::test]
    async fn test_page_failure_propagates_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OPTIONS_PATH))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, 5, 10)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(OPTIONS_PATH))
            .and(query_param("offset", "5"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = datasets(&server)
            .get_options_in_batches(&RequestHeaders::new(), &dimension(), &batch(5, 2))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_unusable_total_count_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OPTIONS_PATH))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [option(0)],
                "count": 1,
                "offset": 0,
                "limit": 5,
                "total_count": u64::MAX / 2,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = datasets(&server)
            .get_options_in_batches(&RequestHeaders::new(), &dimension(), &batch(5, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
