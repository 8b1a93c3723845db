//! Error types for the batch engines
//!
//! Both engines hand the caller's own error back untouched, wrapped in a
//! variant that records where in the run it happened:
//! - [`BatchError`] for the concurrent page processor
//! - [`ChunkError`] for the sequential chunk splitter
//!
//! A processor that stops a run early on purpose does not produce an error.

use thiserror::Error;

/// Failure of a concurrent batch run
#[derive(Error, Debug)]
pub enum BatchError<E> {
    /// The page getter failed
    #[error("failed to fetch page at offset {offset}: {source}")]
    Fetch {
        /// Offset of the page that could not be fetched
        offset: usize,
        /// Error returned by the page getter
        source: E,
    },

    /// The page processor failed
    #[error("failed to process page at offset {offset}: {source}")]
    Process {
        /// Offset of the page being processed
        offset: usize,
        /// Error returned by the page processor
        source: E,
    },

    /// A page carried a different consistency token than the first page
    #[error("collection changed during batch (offset {offset}): expected token {expected:?}, got {actual:?}")]
    TokenMismatch {
        /// Offset of the page whose token diverged
        offset: usize,
        /// Token recorded from the first page
        expected: Option<String>,
        /// Token carried by the diverging page
        actual: Option<String>,
    },
}

impl<E> BatchError<E> {
    /// Offset of the page the failure is attributed to
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::Fetch { offset, .. }
            | Self::Process { offset, .. }
            | Self::TokenMismatch { offset, .. } => *offset,
        }
    }

    /// Check if this is a consistency-token mismatch
    #[must_use]
    pub fn is_token_mismatch(&self) -> bool {
        matches!(self, Self::TokenMismatch { .. })
    }

    /// Recover the caller's error, if the failure came from a callback
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Fetch { source, .. } | Self::Process { source, .. } => Some(source),
            Self::TokenMismatch { .. } => None,
        }
    }
}

/// Failure of a sequential chunked run
///
/// `completed` counts the chunks that succeeded before the failing one, so a
/// failure on the very first chunk reports zero.
#[derive(Error, Debug)]
#[error("chunk failed after {completed} completed chunks: {source}")]
pub struct ChunkError<E> {
    /// Number of chunks processed successfully before the failure
    pub completed: usize,
    /// Error returned by the chunk callback
    pub source: E,
}

impl<E> ChunkError<E> {
    /// Recover the caller's error
    pub fn into_source(self) -> E {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug, PartialEq)]
    #[error("{0}")]
    struct Boom(&'static str);

    #[test]
    fn test_offset_and_source() {
        let err = BatchError::Fetch {
            offset: 40,
            source: Boom("connection reset"),
        };
        assert_eq!(err.offset(), 40);
        assert!(!err.is_token_mismatch());
        assert_eq!(err.into_source(), Some(Boom("connection reset")));
    }

    #[test]
    fn test_token_mismatch_has_no_source() {
        let err: BatchError<Boom> = BatchError::TokenMismatch {
            offset: 20,
            expected: Some("v1".to_string()),
            actual: Some("v2".to_string()),
        };
        assert!(err.is_token_mismatch());
        assert!(err.to_string().contains("offset 20"));
        assert_eq!(err.into_source(), None);
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;

        let err = BatchError::Process {
            offset: 10,
            source: Boom("bad item"),
        };
        assert_eq!(err.source().map(ToString::to_string), Some("bad item".to_string()));

        let chunk = ChunkError {
            completed: 2,
            source: Boom("412 precondition failed"),
        };
        assert!(chunk.to_string().starts_with("chunk failed after 2 completed chunks"));
        assert_eq!(chunk.into_source(), Boom("412 precondition failed"));
    }
}
