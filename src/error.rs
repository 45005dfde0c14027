//! Error taxonomy for the buffer pool manager.
//!
//! Precondition violations (empty free list, `swizzle()` on a non-cooling
//! swip, and similar buffer-manager bugs) are not represented here - they
//! are programming errors and abort via `panic!`/`debug_assert!`. This
//! enum only carries the recoverable categories: I/O failures, page-id
//! exhaustion, and bad builder configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("I/O error on page {page_id}: {source}")]
    Io {
        page_id: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    PlainIo(#[from] std::io::Error),

    #[error("no free page ids available (page_count exhausted)")]
    PageIdsExhausted,

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, BufferPoolError>;

impl BufferPoolError {
    pub fn io(page_id: u64, source: std::io::Error) -> Self {
        BufferPoolError::Io { page_id, source }
    }
}
