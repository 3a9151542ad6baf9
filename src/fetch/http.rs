//! Remote HTTP fetcher backed by a shared reqwest client.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::params::FetchParams;
use super::traits::{FetchError, Fetcher};

/// Driver options from configuration
#[derive(Debug, Deserialize)]
struct Options {
    #[serde(default = "default_user_agent")]
    user_agent: String,
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("docforge/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Per-request parameters
#[derive(Debug, Deserialize)]
struct Params {
    #[serde(default)]
    url: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    /// Base64-encoded request body
    #[serde(default)]
    data: String,
    /// Literal find/replace substitutions applied to the response body
    #[serde(default)]
    replace: BTreeMap<String, String>,
}

impl Params {
    /// Normalizes the method (defaults to GET, case-insensitive) and
    /// rejects anything other than GET/POST.
    fn validate(&mut self) -> Result<Method, FetchError> {
        if self.url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        self.method = self.method.to_uppercase();
        if self.method.is_empty() {
            self.method = "GET".to_string();
        }

        match self.method.as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            other => Err(FetchError::UnsupportedMethod(other.to_string())),
        }
    }
}

pub struct HttpFetcher {
    client: Client,
}

pub fn new_http_fetcher(options: &Value) -> Result<Arc<dyn Fetcher>, FetchError> {
    let options: Options = if options.is_null() {
        Options::default()
    } else {
        serde_json::from_value(options.clone())
            .map_err(|err| FetchError::Options(err.to_string()))?
    };

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(options.connect_timeout_secs))
        .user_agent(&options.user_agent)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|err| FetchError::Options(err.to_string()))?;

    Ok(Arc::new(HttpFetcher { client }))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, params: FetchParams) -> Result<Vec<u8>, FetchError> {
        let mut params: Params = params.decode()?;
        let method = params.validate()?;

        self.send(method, params).await
    }
}

impl HttpFetcher {
    async fn send(&self, method: Method, params: Params) -> Result<Vec<u8>, FetchError> {
        debug!(url = %params.url, method = %params.method, "Fetching remote content");

        let mut request = self.client.request(method, &params.url);

        for (name, value) in &params.headers {
            request = request.header(name, value);
        }

        if !params.data.is_empty() {
            request = request.body(BASE64.decode(params.data.as_bytes())?);
        }

        let response = request.send().await.map_err(|err| FetchError::Request {
            method: params.method.clone(),
            url: params.url.clone(),
            message: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                method: params.method.clone(),
                url: params.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|err| FetchError::Request {
            method: params.method.clone(),
            url: params.url.clone(),
            message: err.to_string(),
        })?;

        let mut data = body.to_vec();
        for (find, replacement) in &params.replace {
            data = replace_all(&data, find.as_bytes(), replacement.as_bytes());
        }

        debug!(url = %params.url, size = data.len(), "Fetch completed");

        Ok(data)
    }
}

/// Byte-level literal replacement; substitutions may target binary content.
fn replace_all(data: &[u8], find: &[u8], replacement: &[u8]) -> Vec<u8> {
    if find.is_empty() {
        return data.to_vec();
    }

    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if data[i..].starts_with(find) {
            out.extend_from_slice(replacement);
            i += find.len();
        } else {
            out.push(data[i]);
            i += 1;
        }
    }

    out
}
