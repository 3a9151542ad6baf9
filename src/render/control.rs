//! Response-control object exposed to templates.
//!
//! Templates receive this as `response` and may set headers, force a
//! status code, write body bytes directly, and "hold" the response so the
//! renderer does not append the template's own textual output.

use minijinja::value::{Object, Value, from_args};
use minijinja::{Error, State};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Everything a template wrote through the control object.
#[derive(Debug, Clone, Default)]
pub struct ResponseSink {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub hold: bool,
}

/// Shared handle passed into template evaluation; cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ResponseControl {
    sink: Arc<Mutex<ResponseSink>>,
}

impl ResponseControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected writes, taken after evaluation.
    pub fn sink(&self) -> ResponseSink {
        self.sink.lock().expect("response sink poisoned").clone()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ResponseSink) -> R) -> R {
        f(&mut self.sink.lock().expect("response sink poisoned"))
    }
}

/// Coerce any template value to a header-ish string.
fn stringify(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

impl Object for ResponseControl {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "set_header" => {
                let (key, value): (Value, Value) = from_args(args)?;
                self.with(|sink| {
                    sink.headers.push((stringify(&key), stringify(&value)))
                });
                Ok(Value::UNDEFINED)
            }
            "write_header" => {
                let (code,): (u16,) = from_args(args)?;
                self.with(|sink| sink.status = Some(code));
                Ok(Value::UNDEFINED)
            }
            "write" => {
                let (value,): (Value,) = from_args(args)?;
                let bytes = match value.as_bytes() {
                    Some(bytes) => bytes.to_vec(),
                    None => stringify(&value).into_bytes(),
                };
                self.with(|sink| sink.body.extend_from_slice(&bytes));
                Ok(Value::UNDEFINED)
            }
            "hold" => {
                let (flag,): (Value,) = from_args(args)?;
                self.with(|sink| sink.hold = flag.is_true());
                Ok(Value::UNDEFINED)
            }
            _ => Err(Error::from(minijinja::ErrorKind::UnknownMethod)),
        }
    }
}

impl fmt::Display for ResponseControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response")
    }
}
