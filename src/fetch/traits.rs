use async_trait::async_trait;
use thiserror::Error;

use super::params::FetchParams;

/// Fetch errors surfaced to the caller as request-level failures.
///
/// Transport and status errors carry the method and URL so a failed
/// remote fetch can be diagnosed without server-side log access.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("parse fetch params failure: {0}")]
    Params(String),

    #[error("params of data is empty")]
    EmptyData,

    #[error("decode inline data failure: {0}")]
    DataDecode(#[from] base64::DecodeError),

    #[error("params of url is empty")]
    EmptyUrl,

    #[error("method {0} not supported")]
    UnsupportedMethod(String),

    #[error("fetch url by {method} failure <{url}>, error: {message}")]
    Request {
        method: String,
        url: String,
        message: String,
    },

    #[error("fetch url by {method} failure <{url}>, status code is {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
    },

    #[error("invalid fetcher options: {0}")]
    Options(String),
}

/// Content-retrieval driver selected by name per request.
///
/// One instance is bound per configured fetcher at startup and shared by
/// all in-flight requests, so implementations must be safe for concurrent
/// use (the HTTP driver's connection pool is the only shared mutable state).
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Decode the opaque params into the driver's shape and retrieve the bytes
    async fn fetch(&self, params: FetchParams) -> Result<Vec<u8>, FetchError>;
}
