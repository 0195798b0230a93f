//! Request handler module
//!
//! Routing dispatch plus the two JSON endpoints.

mod appeal;
mod calculate;
pub mod router;

use serde_json::{Map, Value};

use crate::error::{ApiError, FieldError};

// Re-export main entry point
pub use router::handle_request;

/// Decode a body that must be a JSON object.
///
/// Malformed JSON and non-object bodies fail as a whole; checking the
/// individual fields is left to each endpoint.
fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson(e.to_string()))? {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::Validation(vec![FieldError::whole_body(
            "model_attributes_type",
            "Input should be a valid dictionary or object to extract fields from",
        )])),
    }
}
