//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route resolution, body
//! limits, dispatch to the endpoint handlers and access logging.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};

use super::{appeal, calculate};
use crate::config::{AppState, HealthConfig};
use crate::error::ApiError;
use crate::http;
use crate::logger::{self, AccessLogEntry};

const ALLOW_POST: &str = "POST, OPTIONS";
const ALLOW_HEALTH: &str = "GET, HEAD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Calculate,
    Appeal,
}

const ENDPOINTS: [(&str, Endpoint); 2] = [
    ("/calculate/", Endpoint::Calculate),
    ("/appeal/", Endpoint::Appeal),
];

/// Where a request goes, decided from method and path alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Endpoint(Endpoint),
    Health { is_head: bool },
    /// Slashless form of an endpoint path
    Redirect(&'static str),
    Preflight,
    MethodNotAllowed(&'static str),
    NotFound,
}

pub fn resolve(method: &Method, path: &str, health: &HealthConfig) -> Route {
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return match *method {
            Method::GET => Route::Health { is_head: false },
            Method::HEAD => Route::Health { is_head: true },
            _ => Route::MethodNotAllowed(ALLOW_HEALTH),
        };
    }

    for (endpoint_path, endpoint) in ENDPOINTS {
        if path == endpoint_path {
            return match *method {
                Method::POST => Route::Endpoint(endpoint),
                Method::OPTIONS => Route::Preflight,
                _ => Route::MethodNotAllowed(ALLOW_POST),
            };
        }
        if path == endpoint_path.trim_end_matches('/') {
            return Route::Redirect(endpoint_path);
        }
    }

    Route::NotFound
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let route = resolve(&parts.method, parts.uri.path(), &state.config.health);
    logger::log_debug(&format!("{} {} -> {route:?}", parts.method, parts.uri));

    let mut response = match route {
        Route::Endpoint(endpoint) => match read_body(&parts, body, state.config.http.max_body_size).await {
            Ok(bytes) => dispatch(endpoint, &bytes, &state).await,
            Err(e) => e.into_response(),
        },
        Route::Health { is_head } => http::build_health_response(is_head),
        Route::Redirect(target) => {
            let location = match parts.uri.query() {
                Some(q) => format!("{target}?{q}"),
                None => target.to_string(),
            };
            http::build_redirect_response(&location, StatusCode::TEMPORARY_REDIRECT)
        }
        Route::Preflight => http::build_options_response(ALLOW_POST, state.config.http.enable_cors),
        Route::MethodNotAllowed(allow) => {
            logger::log_warning(&format!("Method not allowed: {} {}", parts.method, parts.uri.path()));
            http::build_405_response(allow)
        }
        Route::NotFound => http::build_404_response(),
    };

    http::apply_common_headers(&mut response, &state.config.http);

    if state.config.logging.access_log {
        let entry = access_entry(&parts, peer_addr, &response, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Run an endpoint over an already-read body
pub async fn dispatch(endpoint: Endpoint, body: &[u8], state: &AppState) -> Response<Full<Bytes>> {
    let result = match endpoint {
        Endpoint::Calculate => calculate::handle_calculate(body, &state.config.calculate).await,
        Endpoint::Appeal => appeal::handle_appeal(body, &state.appeals, Local::now()).await,
    };
    result.unwrap_or_else(ApiError::into_response)
}

/// Collect the body, refusing anything over `max_body_size`.
///
/// A declared `Content-Length` above the limit is refused before reading.
async fn read_body(parts: &Parts, body: Incoming, max_body_size: u64) -> Result<Bytes, ApiError> {
    if let Some(len) = declared_length(parts) {
        if len > max_body_size {
            return Err(ApiError::PayloadTooLarge);
        }
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => Err(ApiError::PayloadTooLarge),
        Err(e) => Err(ApiError::BodyRead(e.to_string())),
    }
}

fn declared_length(parts: &Parts) -> Option<u64> {
    let value = parts.headers.get("content-length")?;
    match value.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(len) => Some(len),
        None => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: {value:?}, skipping size check"
            ));
            None
        }
    }
}

fn access_entry(
    parts: &Parts,
    peer_addr: SocketAddr,
    response: &Response<Full<Bytes>>,
    started: Instant,
) -> AccessLogEntry {
    use hyper::body::Body;

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    AccessLogEntry {
        remote_addr: peer_addr.ip().to_string(),
        time: Local::now(),
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(ToString::to_string),
        http_version: format!("{:?}", parts.version).trim_start_matches("HTTP/").to_string(),
        status: response.status().as_u16(),
        body_bytes: usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(0),
        referer: header("referer"),
        user_agent: header("user-agent"),
        request_time_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state_in(dir: &std::path::Path) -> AppState {
        let mut cfg = Config::defaults().unwrap();
        cfg.appeals.dir = dir.to_string_lossy().into_owned();
        AppState::new(cfg)
    }

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn appeal_body(last_name: &str, birth_date: &str, phone: &str) -> Vec<u8> {
        serde_json::json!({
            "last_name": last_name,
            "first_name": "Иван",
            "birth_date": birth_date,
            "phone": phone,
            "email": "ivanov@example.com",
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_resolve() {
        let health = HealthConfig::default();
        assert_eq!(
            resolve(&Method::POST, "/calculate/", &health),
            Route::Endpoint(Endpoint::Calculate)
        );
        assert_eq!(
            resolve(&Method::POST, "/appeal/", &health),
            Route::Endpoint(Endpoint::Appeal)
        );
        assert_eq!(resolve(&Method::POST, "/appeal", &health), Route::Redirect("/appeal/"));
        assert_eq!(
            resolve(&Method::GET, "/calculate/", &health),
            Route::MethodNotAllowed(ALLOW_POST)
        );
        assert_eq!(resolve(&Method::OPTIONS, "/appeal/", &health), Route::Preflight);
        assert_eq!(resolve(&Method::HEAD, "/readyz", &health), Route::Health { is_head: true });
        assert_eq!(resolve(&Method::POST, "/healthz", &health), Route::MethodNotAllowed(ALLOW_HEALTH));
        assert_eq!(resolve(&Method::POST, "/", &health), Route::NotFound);
        assert_eq!(resolve(&Method::POST, "/appeal/x", &health), Route::NotFound);
    }

    #[test]
    fn test_health_can_be_disabled() {
        let health = HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        };
        assert_eq!(resolve(&Method::GET, "/healthz", &health), Route::NotFound);
    }

    #[tokio::test]
    async fn test_calculate_endpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(tmp.path());
        let body = br#"{"numbers": [2, 3.5], "delays": [0.1, 0.2]}"#;

        let resp = dispatch(Endpoint::Calculate, body, &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(json["results"][0]["square"], 4.0);
        assert_eq!(json["results"][1]["square"], 12.25);
        assert_eq!(json["results"][1]["delay"], 0.2);
        assert!(json["total_time"].as_f64().unwrap() < 0.3);
        assert!(json["parallel_faster_than_sequential"].is_boolean());
    }

    #[tokio::test]
    async fn test_calculate_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(tmp.path());

        let resp = dispatch(Endpoint::Calculate, br#"{"numbers": [], "delays": []}"#, &state).await;
        let json = body_json(resp).await;
        assert_eq!(json["results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_calculate_mismatch_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(tmp.path());

        let resp = dispatch(Endpoint::Calculate, br#"{"numbers": [1, 2], "delays": [0.1]}"#, &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["loc"][1], "delays");
    }

    #[tokio::test]
    async fn test_calculate_wrong_types() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(tmp.path());

        let resp = dispatch(Endpoint::Calculate, br#"{"numbers": "1,2", "delays": []}"#, &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["loc"], serde_json::json!(["body", "numbers"]));
        assert_eq!(json["detail"][0]["type"], "list_type");

        let resp = dispatch(Endpoint::Calculate, br#"{"numbers": [1], "delays": ["x"]}"#, &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["loc"], serde_json::json!(["body", "delays", "0"]));
        assert_eq!(json["detail"][0]["type"], "float_type");

        let resp = dispatch(Endpoint::Calculate, b"{not json", &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["loc"], serde_json::json!(["body"]));
        assert_eq!(json["detail"][0]["type"], "json_invalid");

        let resp = dispatch(Endpoint::Calculate, b"[1, 2]", &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["type"], "model_attributes_type");
    }

    #[tokio::test]
    async fn test_appeal_saved_and_matches_file() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(&tmp.path().join("appeals"));

        let resp = dispatch(
            Endpoint::Appeal,
            &appeal_body("Иванов", "1990-05-15", "+79161234567"),
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;

        let filename = json["filename"].as_str().unwrap();
        let pattern = regex::Regex::new(r"^appeal_\d{8}_\d{6}\.json$").unwrap();
        assert!(pattern.is_match(filename), "unexpected filename {filename}");
        assert_eq!(json["data"]["birth_date"], "1990-05-15");
        assert!(json["message"].is_string());

        let text = std::fs::read_to_string(tmp.path().join("appeals").join(filename)).unwrap();
        let on_disk: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(on_disk, json["data"]);
    }

    #[tokio::test]
    async fn test_invalid_appeal_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("appeals");
        let state = state_in(&dir);

        let resp = dispatch(Endpoint::Appeal, &appeal_body("ivanov", "1990-05-15", "abcdefghij"), &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        let fields: Vec<&str> = json["detail"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["loc"][1].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["last_name", "phone"]);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_appeal_birth_date_tomorrow() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(tmp.path());
        let tomorrow = (Local::now().date_naive() + chrono::Days::new(1)).format("%Y-%m-%d").to_string();

        let resp = dispatch(Endpoint::Appeal, &appeal_body("Иванов", &tomorrow, "+79161234567"), &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["loc"][1], "birth_date");
    }

    #[tokio::test]
    async fn test_appeal_wrong_type_names_the_field() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("appeals");
        let state = state_in(&dir);
        let body = serde_json::json!({
            "last_name": "Иванов",
            "first_name": "Иван",
            "birth_date": "1990-05-15",
            "phone": 79_161_234_567_u64,
            "email": "ivanov@example.com",
        })
        .to_string();

        let resp = dispatch(Endpoint::Appeal, body.as_bytes(), &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"].as_array().unwrap().len(), 1);
        assert_eq!(json["detail"][0]["loc"], serde_json::json!(["body", "phone"]));
        assert_eq!(json["detail"][0]["type"], "string_type");
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_appeal_unpadded_birth_date_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_in(tmp.path());

        let resp = dispatch(Endpoint::Appeal, &appeal_body("Иванов", "1990-5-1", "+79161234567"), &state).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["detail"][0]["loc"][1], "birth_date");
        assert_eq!(json["detail"][0]["type"], "date_parsing");
    }
}
