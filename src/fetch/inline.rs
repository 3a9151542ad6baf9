//! Inline data fetcher: the request params carry the payload directly.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::params::FetchParams;
use super::traits::{FetchError, Fetcher};

#[derive(Debug, Deserialize)]
struct Params {
    /// Base64-encoded payload
    #[serde(default)]
    data: String,
}

impl Params {
    fn validate(&self) -> Result<(), FetchError> {
        if self.data.is_empty() {
            return Err(FetchError::EmptyData);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InlineFetcher;

pub fn new_inline_fetcher(_options: &Value) -> Result<Arc<dyn Fetcher>, FetchError> {
    Ok(Arc::new(InlineFetcher))
}

#[async_trait]
impl Fetcher for InlineFetcher {
    async fn fetch(&self, params: FetchParams) -> Result<Vec<u8>, FetchError> {
        let params: Params = params.decode()?;
        params.validate()?;

        Ok(BASE64.decode(params.data.as_bytes())?)
    }
}
