#![cfg(unix)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use docforge::api::state::AppState;
use docforge::config::Config;
use docforge::convert::Converter;
use docforge::fetch::FetcherRegistry;
use docforge::render::TemplateRegistry;

/// Stand-in converter binary: uppercases the staged input into the
/// requested output file, so tests run without a real document tool.
fn fake_converter(dir: &TempDir) -> String {
    let script = r#"#!/bin/sh
prev=""
input=""
output=""
for arg in "$@"; do
  if [ "$prev" = "--quiet" ]; then input="$arg"; fi
  if [ "$prev" = "--output" ]; then output="$arg"; fi
  prev="$arg"
done
tr 'a-z' 'A-Z' < "$input" > "$output"
"#;

    let path = dir.path().join("converter.sh");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .unwrap();
    path.to_string_lossy().into_owned()
}

/// Creates a minimal config for testing, with an inline base64 fetcher
/// bound under the name "inline" and the fake converter as the binary.
fn create_test_config(binary: &str, safe_dir: &std::path::Path) -> Config {
    let config_toml = format!(
        r#"
[server]
bind_addr = "127.0.0.1:0"

[converter]
binary = "{binary}"
timeout_secs = 10
safe_dir = "{safe_dir}"

[fetchers.inline]
driver = "inline"
"#,
        binary = binary,
        safe_dir = safe_dir.display(),
    );

    toml::from_str(&config_toml).expect("Failed to parse test config")
}

/// Builds a test app with isolated dependencies
fn build_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let binary = fake_converter(&temp_dir);
    let config = create_test_config(&binary, temp_dir.path());

    let registry = FetcherRegistry::with_builtin_drivers();
    let fetchers = registry
        .bind(&config.fetchers)
        .expect("Failed to bind fetchers");

    let converter = Converter::new(&config.converter, fetchers);
    let templates = TemplateRegistry::from_config(&config.templates)
        .expect("Failed to build templates");

    let state = AppState::new(config, converter, templates);

    let app = Router::new()
        .route(
            "/convert",
            axum::routing::post(docforge::api::services::convert),
        )
        .route("/ping", axum::routing::get(docforge::api::services::ping))
        .with_state(state);

    (app, temp_dir)
}

/// Helper to build a POST /convert request
fn post_convert_request(args: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri("/convert")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&args).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_convert_success_via_inline_fetcher() {
    let (app, _temp_dir) = build_test_app();

    let request = post_convert_request(json!({
        "fetcher": {
            "name": "inline",
            "params": { "data": BASE64.encode("# hello") }
        },
        "converter": { "from": "markdown", "to": "html" }
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json; charset=utf-8"
    );

    let parsed = body_json(response).await;
    assert_eq!(parsed["code"], 0);
    assert_eq!(parsed["message"], "");

    let payload = BASE64
        .decode(parsed["result"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(payload, b"# HELLO");
}

#[tokio::test]
async fn test_ping() {
    let (app, _temp_dir) = build_test_app();

    let request = Request::builder()
        .uri("/ping")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"pong");
}

#[tokio::test]
async fn test_ping_head() {
    let (app, _temp_dir) = build_test_app();

    let request = Request::builder()
        .uri("/ping")
        .method("HEAD")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_missing_converter_options() {
    let (app, _temp_dir) = build_test_app();

    let request = post_convert_request(json!({
        "fetcher": { "name": "inline", "params": { "data": "aGk=" } }
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["code"], 400);
    assert_eq!(parsed["message"], "converter options is nil");
    assert!(parsed.get("result").is_none());
}

#[tokio::test]
async fn test_malformed_body_is_templated_error() {
    let (app, _temp_dir) = build_test_app();

    let request = Request::builder()
        .uri("/convert")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["code"], 400);
    assert!(!parsed["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_fetcher_name() {
    let (app, _temp_dir) = build_test_app();

    let request = post_convert_request(json!({
        "fetcher": { "name": "nope", "params": {} },
        "converter": { "from": "markdown", "to": "html" }
    }));

    let response = app.oneshot(request).await.unwrap();
    let parsed = body_json(response).await;

    assert_eq!(parsed["code"], 400);
    assert_eq!(parsed["message"], "fetcher nope not exist");
}

#[tokio::test]
async fn test_no_input_method() {
    let (app, _temp_dir) = build_test_app();

    let request = post_convert_request(json!({
        "converter": { "from": "markdown", "to": "html" }
    }));

    let response = app.oneshot(request).await.unwrap();
    let parsed = body_json(response).await;

    assert_eq!(parsed["code"], 400);
    assert_eq!(
        parsed["message"],
        "no input method, please check your fetcher options or uri param"
    );
}

#[tokio::test]
async fn test_data_dir_outside_safe_dir() {
    let (app, _temp_dir) = build_test_app();

    let request = post_convert_request(json!({
        "fetcher": { "name": "inline", "params": { "data": "aGk=" } },
        "converter": {
            "from": "markdown",
            "to": "html",
            "data_dir": "/etc"
        }
    }));

    let response = app.oneshot(request).await.unwrap();
    let parsed = body_json(response).await;

    assert_eq!(parsed["code"], 400);
    assert!(
        parsed["message"]
            .as_str()
            .unwrap()
            .contains("not in safe dir")
    );
}

#[tokio::test]
async fn test_custom_template_with_hold() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let binary = fake_converter(&temp_dir);

    let template_path = temp_dir.path().join("raw.tmpl");
    std::fs::write(
        &template_path,
        concat!(
            r#"{{ response.set_header("Content-Type", "text/html") }}"#,
            r#"{% if code == 0 %}{{ response.write(result.data|base64_decode) }}"#,
            r#"{% else %}{{ response.write_header(500) }}{{ response.write(message) }}{% endif %}"#,
            r#"{{ response.hold(true) }}"#,
        ),
    )
    .unwrap();

    let config_toml = format!(
        r#"
[server]
bind_addr = "127.0.0.1:0"

[converter]
binary = "{binary}"
safe_dir = "{safe_dir}"

[fetchers.inline]
driver = "inline"

[templates.raw]
template = "{template}"
"#,
        binary = binary,
        safe_dir = temp_dir.path().display(),
        template = template_path.display(),
    );
    let config: Config = toml::from_str(&config_toml).unwrap();

    let registry = FetcherRegistry::with_builtin_drivers();
    let fetchers = registry.bind(&config.fetchers).unwrap();
    let converter = Converter::new(&config.converter, fetchers);
    let templates = TemplateRegistry::from_config(&config.templates).unwrap();
    let state = AppState::new(config, converter, templates);

    let app = Router::new()
        .route(
            "/convert",
            axum::routing::post(docforge::api::services::convert),
        )
        .with_state(state);

    let request = post_convert_request(json!({
        "fetcher": {
            "name": "inline",
            "params": { "data": BASE64.encode("hi") }
        },
        "converter": { "from": "markdown", "to": "html" },
        "template": "raw"
    }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"HI");
}
