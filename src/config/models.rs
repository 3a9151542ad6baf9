use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub fetchers: HashMap<String, FetcherConfig>,
    #[serde(default)]
    pub templates: HashMap<String, TemplateConfig>,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            converter: ConverterConfig::default(),
            fetchers: HashMap::new(),
            templates: HashMap::new(),
            cors: CorsConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Route prefix, e.g. "/v1". Empty means routes live at the root.
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default = "default_true")]
    pub gzip_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            path_prefix: String::new(),
            gzip_enabled: true,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

fn default_true() -> bool {
    true
}

/// External converter tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConverterConfig {
    /// Converter executable invoked per conversion
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Hard deadline for one conversion run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Local file references outside this directory are rejected
    #[serde(default = "default_safe_dir")]
    pub safe_dir: PathBuf,
    /// Namespace for downloaded/staged temp files
    #[serde(default = "default_temp_dir_prefix")]
    pub temp_dir_prefix: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub trace: bool,
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
            safe_dir: default_safe_dir(),
            temp_dir_prefix: default_temp_dir_prefix(),
            verbose: false,
            trace: false,
        }
    }
}

fn default_binary() -> String {
    "pandoc".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_safe_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_temp_dir_prefix() -> String {
    "docforge".to_string()
}

/// Named fetcher entry: which driver to instantiate and its options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    pub driver: String,
    /// Driver-specific options (arbitrary JSON)
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Named response template, loaded from disk at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub template: PathBuf,
}

/// CORS configuration; empty lists mean "allow any"
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
}
