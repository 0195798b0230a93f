//! Delay-compute service
//!
//! Runs every (number, delay) pair twice: once with all waits joined on the
//! current task, then once strictly in input order. Only the concurrent run's
//! items are returned; the sequential run exists to time the comparison.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use super::types::{round2, CalculateRequest, CalculateResponse, ResultItem};
use crate::config::{CalculateConfig, LengthMismatch};
use crate::error::FieldError;

/// One validated unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub number: f64,
    pub delay: f64,
    pub wait: Duration,
}

/// Pair up the request's sequences and turn every delay into a wait.
///
/// A negative delay becomes a zero-length wait. A delay the timer cannot
/// represent, or one above `max_delay`, is reported against `delays`.
pub fn plan(req: &CalculateRequest, cfg: &CalculateConfig) -> Result<Vec<Job>, Vec<FieldError>> {
    let mut errors = Vec::new();

    if req.numbers.len() != req.delays.len() && cfg.length_mismatch == LengthMismatch::Reject {
        errors.push(FieldError::body(
            "delays",
            "length_mismatch",
            format!(
                "numbers and delays must have the same length (got {} and {})",
                req.numbers.len(),
                req.delays.len()
            ),
        ));
        return Err(errors);
    }

    let mut jobs = Vec::with_capacity(req.numbers.len().min(req.delays.len()));
    for (index, (&number, &delay)) in req.numbers.iter().zip(&req.delays).enumerate() {
        match wait_for(delay, cfg.max_delay) {
            Ok(wait) => jobs.push(Job { number, delay, wait }),
            Err(msg) => errors.push(FieldError::indexed("delays", index, "value_error", msg)),
        }
    }

    if errors.is_empty() {
        Ok(jobs)
    } else {
        Err(errors)
    }
}

fn wait_for(delay: f64, max_delay: Option<f64>) -> Result<Duration, String> {
    if delay.is_nan() {
        return Err("delay is not a number".to_string());
    }
    if let Some(max) = max_delay {
        if delay > max {
            return Err(format!("delay {delay} exceeds the maximum of {max} seconds"));
        }
    }
    if delay <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(delay).map_err(|e| format!("delay {delay} is out of range: {e}"))
}

/// Wait, then square. `time` is the measured length of this wait alone.
pub async fn square_with_delay(job: &Job) -> ResultItem {
    let start = Instant::now();
    tokio::time::sleep(job.wait).await;
    let elapsed = start.elapsed();

    ResultItem {
        number: job.number,
        square: job.number * job.number,
        delay: job.delay,
        time: round2(elapsed.as_secs_f64()),
    }
}

/// Concurrent run followed by a sequential rerun of the same jobs.
pub async fn run(jobs: &[Job]) -> CalculateResponse {
    let start_parallel = Instant::now();
    let results = join_all(jobs.iter().map(square_with_delay)).await;
    let parallel_time = start_parallel.elapsed();

    let start_seq = Instant::now();
    for job in jobs {
        square_with_delay(job).await;
    }
    let seq_time = start_seq.elapsed();

    CalculateResponse {
        results,
        total_time: round2(parallel_time.as_secs_f64()),
        parallel_faster_than_sequential: parallel_time < seq_time,
    }
}
