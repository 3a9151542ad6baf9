//! Conversion orchestrator: fetch -> stage -> run -> read output.
//!
//! Each call is an independent unit of work; the only shared state is the
//! read-only fetcher map, so arbitrarily many conversions may run
//! concurrently. Staged input/output files live in a per-call temp
//! directory removed on every exit path.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::options::{ConvertOptions, GlobalFlags};
use super::runner::{self, RunError};
use crate::config::ConverterConfig;
use crate::fetch::{FetchError, FetchParams, Fetcher};
use crate::stage::{SourceFile, StageError, within_safe_dir};

/// Which configured fetcher retrieves the source, with its opaque params
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("data_dir '{path}' is not in safe dir '{safe_dir}'")]
    OutsideSafeDir { path: String, safe_dir: String },

    #[error("no input method, please check your fetcher options or uri param")]
    NoInput,

    #[error("fetcher {0} not exist")]
    UnknownFetcher(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("stage conversion file failure: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Converter {
    binary: String,
    timeout: Duration,
    safe_dir: PathBuf,
    temp_dir_prefix: String,
    flags: GlobalFlags,
    fetchers: BTreeMap<String, Arc<dyn Fetcher>>,
}

impl Converter {
    pub fn new(
        config: &ConverterConfig,
        fetchers: BTreeMap<String, Arc<dyn Fetcher>>,
    ) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout(),
            safe_dir: config.safe_dir.clone(),
            temp_dir_prefix: config.temp_dir_prefix.clone(),
            flags: GlobalFlags {
                verbose: config.verbose,
                trace: config.trace,
            },
            fetchers,
        }
    }

    /// Run one conversion: retrieve the source, stage it as a temp input
    /// file, invoke the converter under the global timeout, and read back
    /// the produced output file.
    pub async fn convert(
        &self,
        fetcher: Option<&FetchSpec>,
        uri: Option<&str>,
        options: &ConvertOptions,
    ) -> Result<Vec<u8>, ConvertError> {
        if !options.data_dir.is_empty()
            && !within_safe_dir(Path::new(&options.data_dir), &self.safe_dir)
        {
            return Err(ConvertError::OutsideSafeDir {
                path: options.data_dir.clone(),
                safe_dir: self.safe_dir.display().to_string(),
            });
        }

        let data = self.fetch_input(fetcher, uri).await?;

        // Input and output live in this directory; dropping it removes
        // both no matter how the conversion ends.
        let workdir = tempfile::Builder::new()
            .prefix(&self.temp_dir_prefix)
            .tempdir()?;

        let input = workdir
            .path()
            .join(format!("{}.{}", Uuid::new_v4(), options.from));
        let output = workdir
            .path()
            .join(format!("{}.{}", Uuid::new_v4(), options.to));

        tokio::fs::write(&input, &data).await?;

        let mut args = options.to_args(self.flags);
        args.push("--quiet".to_string());
        args.push(input.to_string_lossy().into_owned());
        args.push("--output".to_string());
        args.push(output.to_string_lossy().into_owned());

        debug!(binary = %self.binary, from = %options.from, to = %options.to, "Running converter");

        runner::run(self.timeout, &self.binary, &args).await?;

        Ok(tokio::fs::read(&output).await?)
    }

    async fn fetch_input(
        &self,
        fetcher: Option<&FetchSpec>,
        uri: Option<&str>,
    ) -> Result<Vec<u8>, ConvertError> {
        if let Some(spec) = fetcher {
            if !spec.name.is_empty() {
                let fetcher = self
                    .fetchers
                    .get(&spec.name)
                    .ok_or_else(|| ConvertError::UnknownFetcher(spec.name.clone()))?;

                return Ok(fetcher
                    .fetch(FetchParams::new(spec.params.clone()))
                    .await?);
            }
        }

        if let Some(uri) = uri.filter(|u| !u.is_empty()) {
            let source = SourceFile::new(uri, &self.safe_dir, &self.temp_dir_prefix);

            let data = match source.path().await {
                Ok(path) => tokio::fs::read(&path).await.map_err(ConvertError::from),
                Err(err) => Err(err.into()),
            };

            source.cleanup().await;
            return data;
        }

        Err(ConvertError::NoInput)
    }
}
