//! HTTP response building module
//!
//! Builders for the JSON responses the service sends, decoupled from the
//! handlers that decide on them.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, SERVER};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::HttpConfig;

const JSON: &str = "application/json";

/// Serialize `body` as the response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => build(status, JSON, Bytes::from(json)),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            build_detail_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// `{"detail": "<message>"}`
pub fn build_detail_response(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "detail": detail });
    build(status, JSON, Bytes::from(body.to_string()))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_detail_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    with_header(
        build_detail_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
        "Allow",
        allow,
    )
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(allow: &str, enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", allow)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Redirect keeping method and body
pub fn build_redirect_response(target: &str, status: StatusCode) -> Response<Full<Bytes>> {
    with_header(build(status, JSON, Bytes::new()), "Location", target)
}

pub fn build_health_response(is_head: bool) -> Response<Full<Bytes>> {
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from_static(br#"{"status":"ok"}"#)
    };
    build(StatusCode::OK, JSON, body)
}

/// Stamp the headers every response carries
pub fn apply_common_headers(resp: &mut Response<Full<Bytes>>, http_config: &HttpConfig) {
    if let Ok(name) = HeaderValue::from_str(&http_config.server_name) {
        resp.headers_mut().insert(SERVER, name);
    }
    if http_config.enable_cors {
        resp.headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

fn build(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

fn with_header(mut resp: Response<Full<Bytes>>, name: &'static str, value: &str) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            resp.headers_mut().insert(name, v);
        }
        Err(e) => crate::logger::log_error(&format!("Invalid {name} header value '{value}': {e}")),
    }
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn http_config(enable_cors: bool) -> HttpConfig {
        HttpConfig {
            server_name: "test/1.0".to_string(),
            enable_cors,
            max_body_size: 1024,
        }
    }

    #[tokio::test]
    async fn test_json_response() {
        let resp = json_response(StatusCode::CREATED, &serde_json::json!({"a": "б"}));
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["Content-Type"], "application/json");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], "{\"a\":\"б\"}".as_bytes());
    }

    #[test]
    fn test_405_has_allow() {
        let resp = build_405_response("POST, OPTIONS");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "POST, OPTIONS");
    }

    #[test]
    fn test_redirect() {
        let resp = build_redirect_response("/appeal/", StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers()["Location"], "/appeal/");
    }

    #[test]
    fn test_common_headers() {
        let mut resp = build_404_response();
        apply_common_headers(&mut resp, &http_config(false));
        assert_eq!(resp.headers()[SERVER], "test/1.0");
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        apply_common_headers(&mut resp, &http_config(true));
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_options_cors() {
        let plain = build_options_response("POST, OPTIONS", false);
        assert_eq!(plain.status(), StatusCode::NO_CONTENT);
        assert!(plain.headers().get("Access-Control-Allow-Methods").is_none());

        let cors = build_options_response("POST, OPTIONS", true);
        assert_eq!(cors.headers()["Access-Control-Allow-Methods"], "POST, OPTIONS");
    }
}
