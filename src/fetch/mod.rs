//! Pluggable content-fetcher drivers
//!
//! A conversion request names a configured fetcher and carries an opaque
//! parameter blob; the driver decodes the blob into its own shape and
//! retrieves the source bytes.
//!
//! ## Key Components
//!
//! - [`Fetcher`] - driver trait (`fetch(params) -> bytes`)
//! - [`FetcherRegistry`] - driver name -> constructor, bound at startup
//! - [`InlineFetcher`] - inline base64 payload pass-through
//! - [`HttpFetcher`] - remote GET/POST retrieval with response substitutions

mod http;
mod inline;
mod params;
mod registry;
mod traits;

pub use http::HttpFetcher;
pub use inline::InlineFetcher;
pub use params::FetchParams;
pub use registry::{FetcherRegistry, NewFetcherFn, RegistryError};
pub use traits::{FetchError, Fetcher};
