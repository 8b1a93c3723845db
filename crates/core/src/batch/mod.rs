//! Batch engines for paged collections and bulk mutations
//!
//! - [`process_in_concurrent_batches`]: fetch a paged collection with bounded
//!   parallelism and hand each page to a processor, one at a time
//! - [`process_in_batches`]: apply a mutation to fixed-size chunks of a list,
//!   strictly in order

mod concurrent;
mod config;
mod sequential;

pub use concurrent::{process_in_concurrent_batches, remaining_pages, FetchedPage};
pub use config::{BatchConfig, DEFAULT_MAX_WORKERS, DEFAULT_PAGE_SIZE};
pub use sequential::{process_in_batches, ChunkedRun};
