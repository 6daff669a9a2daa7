//! API clients for imageboards

pub mod fourchan;

use std::future::Future;

use thiserror::Error;

use crate::models::{Board, Post, Thread};

pub use fourchan::FourChanClient;

/// Errors returned by an imageboard API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The resource does not exist (HTTP 404), e.g. a pruned thread
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered with a non-success status
    #[error("server returned {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The request could not be sent or the body could not be read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body was not the expected JSON
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Whether the error means the resource is gone for good
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Read operations the watcher and views need from an imageboard
pub trait ImageboardApi: Send + Sync {
    /// List all boards
    fn list_boards(&self) -> impl Future<Output = Result<Vec<Board>, ApiError>> + Send;

    /// Fetch the catalog (active threads) of a board
    fn fetch_catalog(&self, board: &str)
    -> impl Future<Output = Result<Vec<Thread>, ApiError>> + Send;

    /// Fetch all posts of a thread, oldest first; the root post comes first
    fn fetch_posts(&self, thread: &Thread)
    -> impl Future<Output = Result<Vec<Post>, ApiError>> + Send;
}
