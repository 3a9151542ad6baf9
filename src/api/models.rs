//! API models for the convert endpoint.
//!
//! A conversion request names a configured fetcher (or a bare `uri`),
//! carries the converter options, and may pick a response template:
//!
//! ```json
//! {
//!   "fetcher": {
//!     "name": "inline",
//!     "params": { "data": "IyBoZWxsbw==" }
//!   },
//!   "converter": {
//!     "from": "markdown",
//!     "to": "html",
//!     "standalone": true
//!   },
//!   "template": "raw"
//! }
//! ```
//!
//! Responses are template-rendered; the default template produces
//! `{"code":0,"message":"","result":{"data":"<base64>"}}` on success and
//! `{"code":400,"message":"..."}` on failure.

use serde::{Deserialize, Serialize};

use crate::convert::{ConvertOptions, FetchSpec};

#[derive(Debug, Deserialize, Default)]
pub struct ConvertRequest {
    #[serde(default)]
    pub fetcher: Option<FetchSpec>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub converter: Option<ConvertOptions>,
    #[serde(default)]
    pub template: Option<String>,
}

/// Conversion payload carried in the `result` field: the produced
/// document, base64-encoded.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertData {
    pub data: String,
}
