//! Concurrent page fetching with serialized processing
//!
//! The first page is fetched on its own to learn the size of the collection.
//! The remaining pages are then fetched with at most `max_workers` requests in
//! flight, and every page is handed to the processor one at a time.
//!
//! Stopping is cooperative: once a page fails or the processor asks to stop,
//! pages that have not started are skipped and pages already being fetched
//! are discarded when they arrive.

use std::future::Future;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::config::BatchConfig;
use crate::error::BatchError;

/// One page returned by a page getter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage<P> {
    /// The page payload
    pub page: P,
    /// Size of the whole collection as reported alongside this page
    pub total_count: usize,
    /// Version marker reported alongside this page, usually an `ETag`
    pub token: Option<String>,
}

impl<P> FetchedPage<P> {
    /// Wrap a page with the collection size it reported
    pub fn new(page: P, total_count: usize) -> Self {
        Self {
            page,
            total_count,
            token: None,
        }
    }

    /// Builder-style method to attach a consistency token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Number of pages still to fetch once the page at offset zero is in
///
/// The first page covers one full multiple of `page_size`, so an exact
/// multiple needs one page fewer than the plain quotient.
#[must_use]
pub fn remaining_pages(total_count: usize, page_size: NonZeroUsize) -> usize {
    let page_size = page_size.get();
    let pages = total_count / page_size;
    if pages > 0 && total_count % page_size == 0 {
        pages - 1
    } else {
        pages
    }
}

struct RunState<F, E> {
    process_page: F,
    token: Option<String>,
    error: Option<BatchError<E>>,
    stopped: bool,
}

impl<F, E> RunState<F, E> {
    fn fail(&mut self, err: BatchError<E>) {
        self.stopped = true;
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// Fetch every page of a collection and feed each one to `process_page`
///
/// `get_page` is called with the offset of the page to fetch and may be
/// running for several offsets at once. `process_page` receives each page
/// together with its token and is never called concurrently with itself; it
/// returns [`ControlFlow::Break`] to stop the run without an error.
///
/// Returns the consistency token of the run. With token validation on this
/// is the first page's token, which every processed page matched. With
/// validation off it is the token of whichever page was processed last, and
/// pages after the first complete in no particular order, so callers must
/// not treat it as the token of the final page.
///
/// # Errors
///
/// The first fatal condition wins and later ones are dropped:
/// - [`BatchError::Fetch`] when `get_page` fails
/// - [`BatchError::Process`] when `process_page` fails
/// - [`BatchError::TokenMismatch`] when validation is on and a page's token
///   differs from the first page's; that page is not processed
///
/// An error takes precedence over a processor-requested stop.
pub async fn process_in_concurrent_batches<P, E, G, Fut, F>(
    get_page: G,
    mut process_page: F,
    config: &BatchConfig,
) -> Result<Option<String>, BatchError<E>>
where
    G: Fn(usize) -> Fut,
    Fut: Future<Output = Result<FetchedPage<P>, E>>,
    F: FnMut(P, Option<&str>) -> Result<ControlFlow<()>, E>,
{
    let page_size = config.page_size.get();

    let first = get_page(0)
        .await
        .map_err(|source| BatchError::Fetch { offset: 0, source })?;
    let total_count = first.total_count;
    let token = first.token;

    let flow = process_page(first.page, token.as_deref())
        .map_err(|source| BatchError::Process { offset: 0, source })?;
    if flow.is_break() {
        debug!(total_count, "processor stopped the batch on the first page");
        return Ok(token);
    }

    let remaining = remaining_pages(total_count, config.page_size);
    if remaining == 0 {
        return Ok(token);
    }

    debug!(
        total_count,
        page_size,
        remaining,
        max_workers = config.max_workers.get(),
        validate_token = config.validate_token,
        "fetching remaining pages"
    );

    let state = Mutex::new(RunState {
        process_page,
        token,
        error: None,
        stopped: false,
    });
    let shared = &state;
    let get_page = &get_page;
    let validate_token = config.validate_token;

    stream::iter((1..=remaining).map(|n| n * page_size))
        .for_each_concurrent(config.max_workers.get(), |offset| async move {
            let stopped = shared.lock().await.stopped;
            if stopped {
                trace!(offset, "batch stopped, skipping page");
                return;
            }

            let fetched = get_page(offset).await;

            let mut guard = shared.lock().await;
            let run = &mut *guard;
            let fetched = match fetched {
                Ok(fetched) => fetched,
                Err(source) => {
                    warn!(offset, "page fetch failed");
                    run.fail(BatchError::Fetch { offset, source });
                    return;
                }
            };
            if run.stopped {
                trace!(offset, "batch stopped while fetching, discarding page");
                return;
            }

            if validate_token {
                if fetched.token != run.token {
                    warn!(
                        offset,
                        expected = ?run.token,
                        actual = ?fetched.token,
                        "consistency token changed during batch"
                    );
                    let expected = run.token.clone();
                    run.fail(BatchError::TokenMismatch {
                        offset,
                        expected,
                        actual: fetched.token,
                    });
                    return;
                }
            } else {
                run.token.clone_from(&fetched.token);
            }

            match (run.process_page)(fetched.page, fetched.token.as_deref()) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    debug!(offset, "processor stopped the batch");
                    run.stopped = true;
                }
                Err(source) => {
                    warn!(offset, "page processing failed");
                    run.fail(BatchError::Process { offset, source });
                }
            }
        })
        .await;

    let run = state.into_inner();
    match run.error {
        Some(err) => Err(err),
        None => Ok(run.token),
    }
}
