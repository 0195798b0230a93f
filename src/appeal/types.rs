use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw body of `POST /appeal/`.
///
/// Kept as untyped JSON so a missing or wrongly typed field is reported
/// next to the other field errors instead of failing the whole body.
#[derive(Debug, Clone, Default)]
pub struct AppealPayload(Map<String, Value>);

impl AppealPayload {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl From<Map<String, Value>> for AppealPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// A validated appeal; this is exactly what lands on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    pub last_name: String,
    pub first_name: String,
    /// Serialized as `YYYY-MM-DD`
    pub birth_date: NaiveDate,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SavedAppeal {
    pub message: String,
    pub filename: String,
    pub data: Appeal,
}
