//! Core batch processing for the dp service clients
//!
//! Service clients page through large collections (dimension options,
//! hierarchy nodes, search results) and apply bulk changes in chunks. This
//! crate holds the two engines they share:
//!
//! - **Concurrent batches**: learn the collection size from the first page,
//!   fetch the rest with a bounded number of requests in flight, process pages
//!   one at a time, and optionally fail if the collection's `ETag` changes
//! - **Sequential batches**: split a list into fixed-size chunks and process
//!   them strictly in order, threading state such as an `ETag` between calls
//!
//! # Example
//!
//! ```rust,no_run
//! use dp_core::batch::{process_in_concurrent_batches, BatchConfig, FetchedPage};
//! use std::ops::ControlFlow;
//!
//! # async fn run() -> Result<(), dp_core::BatchError<std::io::Error>> {
//! let source: Vec<u32> = (0..1_000).collect();
//! let mut collected = vec![0u32; source.len()];
//!
//! process_in_concurrent_batches(
//!     |offset| {
//!         let page = source[offset..(offset + 100).min(source.len())].to_vec();
//!         let total = source.len();
//!         async move { Ok::<_, std::io::Error>(FetchedPage::new((offset, page), total)) }
//!     },
//!     |(offset, page): (usize, Vec<u32>), _etag| {
//!         collected[offset..offset + page.len()].copy_from_slice(&page);
//!         Ok(ControlFlow::Continue(()))
//!     },
//!     &BatchConfig::default(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod error;

pub use batch::{BatchConfig, ChunkedRun, FetchedPage};
pub use error::{BatchError, ChunkError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::{
        process_in_batches, process_in_concurrent_batches, BatchConfig, ChunkedRun, FetchedPage,
    };
    pub use crate::error::{BatchError, ChunkError};
}
