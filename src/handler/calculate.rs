use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::parse_object;
use crate::calculate::{self, CalculateRequest};
use crate::config::CalculateConfig;
use crate::error::ApiError;
use crate::http;
use crate::logger;

/// `POST /calculate/`
pub async fn handle_calculate(body: &[u8], cfg: &CalculateConfig) -> Result<Response<Full<Bytes>>, ApiError> {
    let req = CalculateRequest::from_fields(&parse_object(body)?).map_err(ApiError::Validation)?;
    let jobs = calculate::plan(&req, cfg).map_err(ApiError::Validation)?;

    let resp = calculate::run(&jobs).await;
    logger::log_info(&format!(
        "[Calculate] {} item(s), parallel {:.2}s, parallel faster: {}",
        resp.results.len(),
        resp.total_time,
        resp.parallel_faster_than_sequential
    ));

    Ok(http::json_response(StatusCode::OK, &resp))
}
