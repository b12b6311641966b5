use std::convert::Infallible;

use tracing::{error, warn};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{MethodNotAllowed, PayloadTooLarge, Reject, UnsupportedMediaType};
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::error::Error;
use crate::server::types::ErrorBody;

/// A lifecycle failure carried through warp's rejection machinery.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl Reject for ApiError {}

pub(crate) fn reject(e: Error) -> Rejection {
    warp::reject::custom(ApiError(e))
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn api_error_reply(e: &Error) -> Response {
    let status = match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::ContentUnreachable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Storage(e) => {
            // Storage details stay in the log.
            error!(error = %e, "storage failure");
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error");
        }
    };

    error_reply(status, e.to_string())
}

/// Turn every rejection into a JSON error body with a matching status.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "no such route"));
    }

    let response = if let Some(ApiError(e)) = err.find::<ApiError>() {
        api_error_reply(e)
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        error_reply(StatusCode::BAD_REQUEST, format!("invalid body: {e}"))
    } else if err.find::<UnsupportedMediaType>().is_some() {
        error_reply(StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected a JSON body")
    } else if err.find::<PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "body too large")
    } else if err.find::<MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        warn!(?err, "unhandled rejection");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };

    Ok(response)
}
