//! Strictly ordered chunked processing
//!
//! Used for bulk mutations where each request depends on the previous one,
//! such as a run of `PATCH` calls that each carry the `ETag` returned by the
//! call before it. A state value is threaded from chunk to chunk for that.

use std::future::Future;
use std::num::NonZeroUsize;

use tracing::{debug, warn};

use crate::error::ChunkError;

/// Outcome of a completed chunked run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedRun<S> {
    /// Number of chunks processed
    pub chunks: usize,
    /// State returned by the last chunk, or the initial state if there were none
    pub state: S,
}

/// Split `items` into chunks of `batch_size` and process them one after another
///
/// Chunks are taken left to right and all but the last hold exactly
/// `batch_size` items. Each call to `process_chunk` receives the state
/// returned by the previous call (starting from `init`) and must finish
/// before the next chunk is started. An empty `items` never calls
/// `process_chunk`.
///
/// # Errors
///
/// Returns a [`ChunkError`] as soon as a chunk fails. `completed` holds the
/// number of chunks that succeeded before it, and no later chunk is attempted.
pub async fn process_in_batches<'a, T, S, E, F, Fut>(
    items: &'a [T],
    batch_size: NonZeroUsize,
    init: S,
    mut process_chunk: F,
) -> Result<ChunkedRun<S>, ChunkError<E>>
where
    F: FnMut(S, &'a [T]) -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    let mut state = init;
    let mut completed = 0;

    for chunk in items.chunks(batch_size.get()) {
        state = match process_chunk(state, chunk).await {
            Ok(next) => next,
            Err(source) => {
                warn!(completed, chunk_len = chunk.len(), "chunk failed");
                return Err(ChunkError { completed, source });
            }
        };
        completed += 1;
        debug!(completed, chunk_len = chunk.len(), "chunk processed");
    }

    Ok(ChunkedRun {
        chunks: completed,
        state,
    })
}
