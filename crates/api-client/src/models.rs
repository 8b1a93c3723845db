//! Shared response models
//!
//! Paged list endpoints all return the same envelope, so the dataset and
//! filter APIs share [`Page`] and the helpers for stitching pages back
//! together.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A response body together with the `ETag` the server sent for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Decoded response body
    pub body: T,
    /// Value of the `ETag` response header
    pub etag: Option<String>,
}

/// One page of a paged list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page
    pub items: Vec<T>,
    /// Number of items in this page
    pub count: usize,
    /// Offset of the first item in the full list
    pub offset: usize,
    /// Page size that was requested
    pub limit: usize,
    /// Number of items in the full list
    pub total_count: usize,
}

impl<T> Page<T> {
    /// A page holding the whole list
    #[must_use]
    pub fn complete(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            items,
            count,
            offset: 0,
            limit: count,
            total_count: count,
        }
    }
}

/// Offset and limit for one page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageParams {
    /// Offset of the first item to return
    pub offset: usize,
    /// Maximum number of items to return
    pub limit: usize,
}

impl PageParams {
    /// Create page params
    #[must_use]
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Render as a query string (without the leading `?`)
    #[must_use]
    pub fn query(&self) -> String {
        format!("offset={}&limit={}", self.offset, self.limit)
    }
}

/// Reassembles a list from pages that arrive in any order
///
/// Slots are allocated up front from the total count reported by the first
/// page, and each page is written at its own offset.
#[derive(Debug)]
pub struct PageCollector<T> {
    slots: Vec<Option<T>>,
}

impl<T> PageCollector<T> {
    /// Create a collector for a list of `total_count` items
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidResponse`] if `total_count` is too large to
    /// allocate.
    pub fn new(total_count: usize) -> ApiResult<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(total_count).map_err(|err| {
            ApiError::InvalidResponse(format!("total_count {total_count} cannot be allocated: {err}"))
        })?;
        slots.resize_with(total_count, || None);
        Ok(Self { slots })
    }

    /// Write a page's items at the page's offset
    pub fn insert(&mut self, page: Page<T>) {
        let offset = page.offset;
        let mut dropped = 0;
        for (i, item) in page.items.into_iter().enumerate() {
            match offset.checked_add(i).and_then(|index| self.slots.get_mut(index)) {
                Some(slot) => *slot = Some(item),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(offset, dropped, "page held items past the expected total");
        }
    }

    /// Number of slots filled so far
    #[must_use]
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Finish collecting and return the list as a single page
    ///
    /// Slots that no page filled are left out.
    #[must_use]
    pub fn finish(self) -> Page<T> {
        let filled = self.filled();
        if filled < self.slots.len() {
            debug!(filled, expected = self.slots.len(), "some items were never received");
        }
        Page::complete(self.slots.into_iter().flatten().collect())
    }
}

/// Insert a page into a lazily created collector
///
/// The collector is sized from the `total_count` of the first page it sees.
pub(crate) fn collect<T>(collector: &mut Option<PageCollector<T>>, page: Page<T>) -> ApiResult<()> {
    if collector.is_none() {
        *collector = Some(PageCollector::new(page.total_count)?);
    }
    if let Some(collector) = collector.as_mut() {
        collector.insert(page);
    }
    Ok(())
}
