use chrono::{DateTime, Local};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::parse_object;
use crate::appeal::{self, AppealPayload, AppealStore, SavedAppeal};
use crate::error::ApiError;
use crate::http;

const SAVED_MESSAGE: &str = "Appeal saved successfully";

/// `POST /appeal/`
///
/// `now` fixes both the date birth dates are checked against and the file
/// name, so the two always agree.
pub async fn handle_appeal(
    body: &[u8],
    store: &AppealStore,
    now: DateTime<Local>,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let payload = AppealPayload::from(parse_object(body)?);
    let appeal = appeal::validate(&payload, now.date_naive()).map_err(ApiError::Validation)?;

    let filename = store.save(&appeal, &now).await?;

    Ok(http::json_response(
        StatusCode::OK,
        &SavedAppeal {
            message: SAVED_MESSAGE.to_string(),
            filename,
            data: appeal,
        },
    ))
}
