//! Delay-compute module
//!
//! Squares numbers after simulated I/O waits and compares concurrent against
//! sequential execution time.

mod service;
mod types;

pub use service::{plan, run};
pub use types::CalculateRequest;
