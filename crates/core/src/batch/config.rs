//! Batch configuration

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = non_zero(100);

/// Default number of pages fetched at the same time
pub const DEFAULT_MAX_WORKERS: NonZeroUsize = non_zero(10);

const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("batch limits must be non-zero"),
    }
}

/// Settings for one concurrent batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Items requested per page
    pub page_size: NonZeroUsize,
    /// Upper bound on pages in flight at once
    pub max_workers: NonZeroUsize,
    /// Fail the run if any page's consistency token differs from the first page's
    pub validate_token: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
            validate_token: false,
        }
    }
}

impl BatchConfig {
    /// Create a config with the given page size and worker limit
    #[must_use]
    pub fn new(page_size: NonZeroUsize, max_workers: NonZeroUsize) -> Self {
        Self {
            page_size,
            max_workers,
            validate_token: false,
        }
    }

    /// Builder-style method to set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Builder-style method to set the worker limit
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: NonZeroUsize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Builder-style method to turn consistency-token validation on or off
    #[must_use]
    pub fn with_token_validation(mut self, validate: bool) -> Self {
        self.validate_token = validate;
        self
    }
}
