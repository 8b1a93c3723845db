//! HTTP clients for services behind the dp API router
//!
//! This crate provides typed clients for the dataset and filter APIs, built
//! on the batch engines in `dp-core`.
//!
//! # Features
//!
//! - **Environment-based configuration**: Load the router URL, service token and paging settings from environment variables
//! - **Concurrent paging**: Fetch every page of a list with a bounded number of requests in flight
//! - **Optimistic concurrency**: `ETag` capture on reads, `If-Match` on writes, chained across chunked writes
//! - **Request correlation**: Track requests with unique IDs for debugging
//!
//! # Example
//!
//! ```rust,no_run
//! use dp_api_client::endpoints::DimensionRef;
//! use dp_api_client::{DpClient, RequestHeaders};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client with environment configuration
//!     let client = DpClient::new()?;
//!     let batch = client.config().batch;
//!
//!     // Fetch every option of a dimension
//!     let dimension = DimensionRef::new("cpih01", "time-series", "3", "aggregate");
//!     let options = client
//!         .datasets()
//!         .get_options_in_batches(&RequestHeaders::new(), &dimension, &batch)
//!         .await?;
//!     println!("Got {} options", options.count);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod headers;
pub mod models;

pub use client::DpClient;
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, ApiResult};
pub use headers::RequestHeaders;
pub use models::{Page, PageParams, Versioned};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::DpClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::{DatasetApi, DimensionRef, FilterApi};
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::headers::RequestHeaders;
    pub use crate::models::{Page, PageParams, Versioned};
}
