//! Sandboxed source staging
//!
//! [`SourceFile`] turns a user-supplied URI into a concrete filesystem path:
//! remote URLs are downloaded, `data:` URIs are materialized, and local
//! references are admitted only when they stay inside the configured safe
//! directory. Resolution happens at most once per instance; the outcome
//! (path or error) is cached and returned on subsequent calls. Files the
//! resolver itself created are deleted by [`SourceFile::cleanup`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// `data:<content-type>;<encoding>,<payload>` — the only accepted shape
static DATA_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:(.*?);(.*?),(.*)$").expect("data uri regex"));

#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("file path is not in safe dir")]
    OutsideSafeDir,

    #[error("unknown path scheme, {0}")]
    UnknownScheme(String),

    #[error("parse url of {url} failure, error: {message}")]
    UrlParse { url: String, message: String },

    #[error(
        "base64 data format error, the format should be: data:content-type;encoding,base64string"
    )]
    DataFormat,

    #[error("parse base64 data failure: {0}")]
    DataDecode(String),

    #[error("download file failure for url {url}, error: {message}")]
    Download { url: String, message: String },

    #[error("stage file failure: {0}")]
    Io(String),
}

/// Explicit resolution state; `Failed`/`Resolved` are terminal.
///
/// `staged_dir` is the per-resolution directory the resolver created for
/// a downloaded or decoded source; `None` marks a pre-existing local file
/// the resolver does not own.
#[derive(Debug)]
enum ResolveState {
    Unresolved,
    Resolved {
        path: PathBuf,
        staged_dir: Option<PathBuf>,
    },
    Failed(StageError),
}

/// A user-supplied URI resolved to a local path, at most once.
pub struct SourceFile {
    url: String,
    safe_dir: PathBuf,
    temp_dir_prefix: String,
    state: Mutex<ResolveState>,
}

impl SourceFile {
    pub fn new(
        url: impl Into<String>,
        safe_dir: impl Into<PathBuf>,
        temp_dir_prefix: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            safe_dir: safe_dir.into(),
            temp_dir_prefix: temp_dir_prefix.into(),
            state: Mutex::new(ResolveState::Unresolved),
        }
    }

    /// Resolve the URI to a filesystem path.
    ///
    /// Idempotent: the first call performs the work (download, decode,
    /// sandbox check); later calls return the cached path or error without
    /// repeating it.
    pub async fn path(&self) -> Result<PathBuf, StageError> {
        let mut state = self.state.lock().await;

        match &*state {
            ResolveState::Resolved { path, .. } => Ok(path.clone()),
            ResolveState::Failed(err) => Err(err.clone()),
            ResolveState::Unresolved => match self.resolve().await {
                Ok((path, staged_dir)) => {
                    *state = ResolveState::Resolved {
                        path: path.clone(),
                        staged_dir,
                    };
                    Ok(path)
                }
                Err(err) => {
                    *state = ResolveState::Failed(err.clone());
                    Err(err)
                }
            },
        }
    }

    /// Delete the staged file and its per-resolution directory, but only
    /// when resolution completed without error and the file was created by
    /// this resolver. Safe to call in every other state, including before
    /// any resolution happened.
    pub async fn cleanup(&self) {
        let state = self.state.lock().await;

        if let ResolveState::Resolved {
            staged_dir: Some(dir),
            ..
        } = &*state
        {
            debug!(dir = %dir.display(), "Removing staged source directory");
            if let Err(err) = tokio::fs::remove_dir_all(dir).await {
                warn!(dir = %dir.display(), %err, "Failed to remove staged source directory");
            }
        }
    }

    async fn resolve(&self) -> Result<(PathBuf, Option<PathBuf>), StageError> {
        match classify_scheme(&self.url)? {
            Scheme::Remote => {
                let (dir, path) = self.download_to_file().await?;
                Ok((path, Some(dir)))
            }
            Scheme::Data => {
                let (dir, path) = self.base64_data_to_file().await?;
                Ok((path, Some(dir)))
            }
            Scheme::Local(path) => {
                if !within_safe_dir(&path, &self.safe_dir) {
                    return Err(StageError::OutsideSafeDir);
                }
                Ok((path, None))
            }
        }
    }

    async fn download_to_file(&self) -> Result<(PathBuf, PathBuf), StageError> {
        let download_err = |message: String| StageError::Download {
            url: self.url.clone(),
            message,
        };

        debug!(url = %self.url, "Downloading source");

        let response = reqwest::get(&self.url)
            .await
            .map_err(|err| download_err(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("status code is {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let filename = url_to_filename(&self.url, &content_type)?;

        let data = response
            .bytes()
            .await
            .map_err(|err| download_err(err.to_string()))?;

        self.write_to_temp_file(&filename, &data).await
    }

    async fn base64_data_to_file(&self) -> Result<(PathBuf, PathBuf), StageError> {
        let captures = DATA_URI_RE
            .captures(&self.url)
            .ok_or(StageError::DataFormat)?;

        let content_type = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let payload = captures.get(3).map(|m| m.as_str()).unwrap_or_default();

        let data = BASE64
            .decode(payload.as_bytes())
            .map_err(|err| StageError::DataDecode(err.to_string()))?;

        let mut filename = Uuid::new_v4().to_string();
        if let Some(ext) = extension_for_content_type(content_type) {
            filename.push('.');
            filename.push_str(ext);
        }

        self.write_to_temp_file(&filename, &data).await
    }

    /// Staged files live under a per-resolution unique directory inside the
    /// configured temp namespace, so concurrent conversions never collide.
    /// Returns the created directory alongside the file path; cleanup
    /// removes the directory as a whole.
    async fn write_to_temp_file(
        &self,
        filename: &str,
        data: &[u8],
    ) -> Result<(PathBuf, PathBuf), StageError> {
        let dir = std::env::temp_dir()
            .join(&self.temp_dir_prefix)
            .join(Uuid::new_v4().to_string());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| StageError::Io(format!("make temp dir {}: {err}", dir.display())))?;

        let path = dir.join(filename);

        tokio::fs::write(&path, data)
            .await
            .map_err(|err| StageError::Io(format!("write {}: {err}", path.display())))?;

        Ok((dir, path))
    }
}

#[derive(Debug)]
enum Scheme {
    Remote,
    Data,
    Local(PathBuf),
}

fn classify_scheme(raw: &str) -> Result<Scheme, StageError> {
    match Url::parse(raw) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(Scheme::Remote),
            "data" => Ok(Scheme::Data),
            "file" => Ok(Scheme::Local(PathBuf::from(parsed.path()))),
            other => Err(StageError::UnknownScheme(other.to_string())),
        },
        // A bare path has no scheme and is treated as a local reference
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(Scheme::Local(PathBuf::from(raw)))
        }
        Err(err) => Err(StageError::UrlParse {
            url: raw.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Lexical sandbox check: the normalized candidate must start with the
/// normalized root. No symlink resolution, but `..` escapes are folded
/// away before comparing so they cannot break out.
pub fn within_safe_dir(path: &Path, safe_dir: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(safe_dir))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                // ".." at the root stays at the root
                Some(Component::RootDir) => {}
                Some(Component::ParentDir) | None => out.push(".."),
                _ => {
                    out.pop();
                }
            },
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Derive a staging filename from a URL, falling back to a generated name
/// when the path is empty and inferring an extension from the response
/// content type when the name has none.
fn url_to_filename(raw_url: &str, content_type: &str) -> Result<String, StageError> {
    let parsed = Url::parse(raw_url).map_err(|err| StageError::UrlParse {
        url: raw_url.to_string(),
        message: err.to_string(),
    })?;

    let mut filename = Path::new(parsed.path())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .unwrap_or_default();

    if filename.is_empty() {
        filename = Uuid::new_v4().to_string();
    }

    if Path::new(&filename).extension().is_none() {
        if let Some(ext) = extension_for_content_type(content_type) {
            filename.push('.');
            filename.push_str(ext);
        }
    }

    Ok(filename)
}

/// Extension inference for the document types the converter understands.
fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let media: mime::Mime = content_type.parse().ok()?;

    let ext = match (media.type_().as_str(), media.subtype().as_str()) {
        ("text", "html") => "html",
        ("text", "plain") => "txt",
        ("text", "markdown") => "md",
        ("text", "csv") => "csv",
        ("text", "xml") | ("application", "xml") => "xml",
        ("application", "json") => "json",
        ("application", "pdf") => "pdf",
        ("application", "rtf") | ("text", "rtf") => "rtf",
        ("application", "epub+zip") => "epub",
        ("application", "msword") => "doc",
        ("application", "vnd.openxmlformats-officedocument.wordprocessingml.document") => {
            "docx"
        }
        ("application", "vnd.oasis.opendocument.text") => "odt",
        ("application", "x-latex") | ("text", "x-tex") => "tex",
        _ => return None,
    };

    Some(ext)
}
