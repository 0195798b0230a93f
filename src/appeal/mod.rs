//! Citizen appeal module
//!
//! Validates appeal payloads and persists accepted appeals as JSON files.

mod store;
mod types;
mod validate;

pub use store::AppealStore;
pub use types::{AppealPayload, SavedAppeal};
pub use validate::validate;
