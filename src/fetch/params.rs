use serde::de::DeserializeOwned;
use serde_json::Value;

use super::traits::FetchError;

/// Opaque parameter blob carried by a conversion request.
///
/// Each driver decodes it into its own parameter struct; the registry and
/// orchestrator never look inside.
#[derive(Debug, Clone, Default)]
pub struct FetchParams(Value);

impl FetchParams {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_value(self.0.clone())
            .map_err(|err| FetchError::Params(err.to_string()))
    }
}

impl From<Value> for FetchParams {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
