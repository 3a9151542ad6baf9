use axum::body::Body;
use axum::extract::State;
use bytes::Bytes;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use tracing::{debug, warn};

use super::models::ConvertRequest;
use super::state::AppState;
use crate::render::{ResponseControl, TemplateArgs};

/// Conversion endpoint (POST {prefix}/convert)
///
/// Every outcome, including a malformed request body, is rendered through
/// the response template machinery so operators can reshape error payloads
/// too. The body is therefore read raw rather than through the `Json`
/// extractor, and conversion failures answer with HTTP 200 carrying an
/// in-body `code` of 400 unless the template overrides the status itself.
pub async fn convert(
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    state.metrics.conversion_accepted();

    let req: ConvertRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => {
            state.metrics.conversion_failed();
            return write_resp(
                &state,
                &ConvertRequest::default(),
                400,
                err.to_string(),
                None,
            );
        }
    };

    let Some(options) = req.converter.as_ref() else {
        state.metrics.conversion_failed();
        return write_resp(
            &state,
            &req,
            400,
            "converter options is nil".to_string(),
            None,
        );
    };

    debug!(from = %options.from, to = %options.to, "Conversion requested");

    match state
        .converter
        .convert(req.fetcher.as_ref(), req.uri.as_deref(), options)
        .await
    {
        Ok(data) => {
            state.metrics.conversion_succeeded();
            let result = json!({ "data": BASE64.encode(&data) });
            write_resp(&state, &req, 0, String::new(), Some(result))
        }
        Err(err) => {
            state.metrics.conversion_failed();
            write_resp(&state, &req, 400, err.to_string(), None)
        }
    }
}

/// Liveness endpoint (GET|HEAD {prefix}/ping)
pub async fn ping() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "pong",
    )
}

/// Render the response template and assemble the HTTP response from its
/// textual output plus whatever the template wrote through the `response`
/// control object.
fn write_resp(
    state: &AppState,
    req: &ConvertRequest,
    code: i64,
    message: String,
    result: Option<serde_json::Value>,
) -> Response {
    let args = TemplateArgs {
        from: req
            .converter
            .as_ref()
            .map(|c| c.from.clone())
            .unwrap_or_default(),
        to: req
            .converter
            .as_ref()
            .map(|c| c.to.clone())
            .unwrap_or_default(),
        code,
        message,
        result,
    };

    let control = ResponseControl::new();
    let rendered = state.templates.render(req.template.as_deref(), &args, &control);
    let sink = control.sink();

    let mut body = sink.body;
    if !sink.hold {
        body.extend_from_slice(rendered.as_bytes());
    }

    let status = sink
        .status
        .and_then(|raw| StatusCode::from_u16(raw).ok())
        .unwrap_or(StatusCode::OK);

    let mut builder = Response::builder().status(status);

    let mut has_content_type = false;
    for (name, value) in &sink.headers {
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        builder = builder.header(name, value);
    }
    if !has_content_type {
        builder =
            builder.header(header::CONTENT_TYPE, "application/json; charset=utf-8");
    }

    builder.body(Body::from(body)).unwrap_or_else(|err| {
        warn!(%err, "Template wrote an invalid header");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}
