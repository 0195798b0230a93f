//! Request-level errors and their HTTP mapping

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::http;
use crate::logger;

/// A single violated rule, located inside the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn body(field: &str, kind: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// An error about the body as a whole rather than one field
    pub fn whole_body(kind: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    pub fn indexed(field: &str, index: usize, kind: &str, msg: impl Into<String>) -> Self {
        let mut err = Self::body(field, kind, msg);
        err.loc.push(index.to_string());
        err
    }

    /// Name of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&str> {
        self.loc.get(1).map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field().unwrap_or("body"), e.msg))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Serialize)]
struct DetailList<'a> {
    detail: &'a [FieldError],
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidJson(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            logger::log_error(&self.to_string());
        } else {
            logger::log_warning(&self.to_string());
        }

        match self {
            Self::Validation(errors) => http::json_response(status, &DetailList { detail: &errors }),
            Self::InvalidJson(msg) => {
                let errors = [FieldError::whole_body("json_invalid", msg)];
                http::json_response(status, &DetailList { detail: &errors })
            }
            Self::PayloadTooLarge => http::build_detail_response(status, "Payload Too Large"),
            Self::BodyRead(_) => http::build_detail_response(status, "Failed to read request body"),
            Self::Storage(_) | Self::Serialize(_) => {
                http::build_detail_response(status, "Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(ApiError::from(io).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let err = ApiError::Validation(vec![
            FieldError::body("last_name", "value_error", "bad name"),
            FieldError::body("phone", "value_error", "bad phone"),
        ]);
        let json = body_json(err.into_response()).await;
        assert_eq!(json["detail"][0]["loc"][1], "last_name");
        assert_eq!(json["detail"][1]["loc"][1], "phone");
        assert_eq!(json["detail"][1]["type"], "value_error");
    }

    #[tokio::test]
    async fn test_indexed_error_location() {
        let err = ApiError::Validation(vec![FieldError::indexed("delays", 2, "float_type", "not a number")]);
        let json = body_json(err.into_response()).await;
        assert_eq!(json["detail"][0]["loc"], serde_json::json!(["body", "delays", "2"]));
    }

    #[tokio::test]
    async fn test_server_error_hides_cause() {
        let io = std::io::Error::other("/secret/path");
        let json = body_json(ApiError::Storage(io).into_response()).await;
        assert_eq!(json["detail"], "Internal Server Error");
    }
}
