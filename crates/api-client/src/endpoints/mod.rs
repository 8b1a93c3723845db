//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one service behind the API router.
//!
//! ## Mapping to services
//!
//! | Module | Service | Description |
//! |--------|---------|-------------|
//! | `dataset` | dataset API | Dimension options of a dataset version |
//! | `filter` | filter API | Options selected for a filter dimension, and changes to them |

pub mod dataset;
pub mod filter;

pub use dataset::{DatasetApi, DimensionOption, DimensionRef};
pub use filter::{FilterApi, FilterOption, PatchOp, PatchOperation};
