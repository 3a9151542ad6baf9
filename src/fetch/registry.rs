use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

use super::traits::{FetchError, Fetcher};
use crate::config::FetcherConfig;

/// Constructor for a fetcher driver; receives the driver-specific options
/// from configuration.
pub type NewFetcherFn = fn(&Value) -> Result<Arc<dyn Fetcher>, FetchError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("fetcher driver name is empty")]
    EmptyName,

    #[error("fetcher driver '{0}' already registered")]
    Duplicate(String),

    #[error("fetcher driver '{0}' not found")]
    UnknownDriver(String),

    #[error("fetcher '{name}' construction failed: {source}")]
    Constructor {
        name: String,
        #[source]
        source: FetchError,
    },
}

/// Registry mapping driver names to constructors.
///
/// Populated once by the composing entry point before any request is
/// served; `bind` then turns the configured named fetchers into long-lived
/// instances reused across requests.
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    drivers: BTreeMap<String, NewFetcherFn>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self {
            drivers: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the built-in drivers
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();

        // Registration order is fixed here; a failure is a programming
        // error in the built-in driver set.
        registry
            .register("inline", super::inline::new_inline_fetcher)
            .expect("register builtin inline driver");
        registry
            .register("http", super::http::new_http_fetcher)
            .expect("register builtin http driver");

        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: NewFetcherFn,
    ) -> Result<(), RegistryError> {
        let name = name.into();

        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.drivers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.drivers.insert(name, constructor);
        Ok(())
    }

    /// Instantiate a driver by name with its configured options
    pub fn resolve(
        &self,
        driver: &str,
        options: &Value,
    ) -> Result<Arc<dyn Fetcher>, RegistryError> {
        let constructor = self
            .drivers
            .get(driver)
            .ok_or_else(|| RegistryError::UnknownDriver(driver.to_string()))?;

        constructor(options).map_err(|source| RegistryError::Constructor {
            name: driver.to_string(),
            source,
        })
    }

    /// Resolve every configured named fetcher into a live instance.
    ///
    /// Called once at startup; each name is bound to one instance shared
    /// by all requests for the process lifetime.
    pub fn bind(
        &self,
        configured: &HashMap<String, FetcherConfig>,
    ) -> Result<BTreeMap<String, Arc<dyn Fetcher>>, RegistryError> {
        let mut bound = BTreeMap::new();

        for (name, conf) in configured {
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }

            let fetcher = self.resolve(&conf.driver, &conf.options)?;
            bound.insert(name.clone(), fetcher);
        }

        Ok(bound)
    }
}
