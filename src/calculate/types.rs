//! Request/response types of the delay-compute endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FieldError;

/// Body of `POST /calculate/`.
///
/// `numbers` and `delays` are paired by position.
#[derive(Debug, Clone)]
pub struct CalculateRequest {
    pub numbers: Vec<f64>,
    pub delays: Vec<f64>,
}

impl CalculateRequest {
    /// Pull both lists out of a decoded body, reporting every missing list
    /// and every non-numeric element at its own location.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let numbers = number_list(fields, "numbers", &mut errors);
        let delays = number_list(fields, "delays", &mut errors);
        match (numbers, delays) {
            (Some(numbers), Some(delays)) => Ok(Self { numbers, delays }),
            _ => Err(errors),
        }
    }
}

fn number_list(fields: &Map<String, Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<Vec<f64>> {
    let items = match fields.get(field) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(FieldError::body(field, "list_type", "Input should be a valid list"));
            return None;
        }
        None => {
            errors.push(FieldError::body(field, "missing", "Field required"));
            return None;
        }
    };

    let mut numbers = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item.as_f64() {
            Some(n) => numbers.push(n),
            None => errors.push(FieldError::indexed(
                field,
                index,
                "float_type",
                "Input should be a valid number",
            )),
        }
    }
    (numbers.len() == items.len()).then_some(numbers)
}

/// Outcome of a single (number, delay) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub number: f64,
    pub square: f64,
    /// Delay exactly as submitted, in seconds
    pub delay: f64,
    /// Measured wait in seconds, rounded to 2 decimals
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub results: Vec<ResultItem>,
    /// Wall-clock time of the concurrent run, rounded to 2 decimals
    pub total_time: f64,
    pub parallel_faster_than_sequential: bool,
}

/// Round to 2 decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
