//! Helper functions exposed to response templates.
//!
//! Each helper is registered both as a filter (`value|jsonify`) and as a
//! plain function (`jsonify(value)`).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind};

pub fn register(env: &mut Environment<'_>) {
    env.add_filter("base64_encode", base64_encode);
    env.add_function("base64_encode", base64_encode);
    env.add_filter("base64_decode", base64_decode);
    env.add_function("base64_decode", base64_decode);
    env.add_filter("jsonify", jsonify);
    env.add_function("jsonify", jsonify);
    env.add_filter("md5", md5_hex);
    env.add_function("md5", md5_hex);
    env.add_filter("html_escape", html_escape_str);
    env.add_function("html_escape", html_escape_str);
    env.add_filter("html_unescape", html_unescape_str);
    env.add_function("html_unescape", html_unescape_str);
    env.add_filter("to_bytes", to_bytes);
    env.add_function("to_bytes", to_bytes);
}

/// Bytes of a value: byte values pass through, everything else renders
/// to its string form first.
fn coerce_bytes(value: &Value) -> Vec<u8> {
    match value.as_bytes() {
        Some(bytes) => bytes.to_vec(),
        None => match value.as_str() {
            Some(s) => s.as_bytes().to_vec(),
            None => value.to_string().into_bytes(),
        },
    }
}

fn coerce_string(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn base64_encode(value: Value) -> String {
    BASE64.encode(coerce_bytes(&value))
}

fn base64_decode(value: Value) -> Result<Value, Error> {
    let decoded = BASE64
        .decode(coerce_string(&value).as_bytes())
        .map_err(|err| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("base64 decode failure: {err}"),
            )
        })?;

    Ok(Value::from_bytes(decoded))
}

fn jsonify(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(|err| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("jsonify failure: {err}"),
        )
    })
}

fn md5_hex(value: Value) -> String {
    format!("{:x}", md5::compute(coerce_bytes(&value)))
}

// encode_quoted_attribute escapes exactly `&<>"'`; notably `/` passes
// through untouched.
fn html_escape_str(value: Value) -> String {
    html_escape::encode_quoted_attribute(&coerce_string(&value)).into_owned()
}

fn html_unescape_str(value: Value) -> String {
    html_escape::decode_html_entities(&coerce_string(&value)).into_owned()
}

fn to_bytes(value: Value) -> Value {
    Value::from_bytes(coerce_bytes(&value))
}
