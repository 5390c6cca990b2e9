//! Response building
//!
//! Operation results are serialized unchanged; this module only adds status
//! codes and headers.

use dn_abilities::AbilityError;
use dn_artifact::etag;
use dn_core::{Conditional, OperationError, WriteMeta};
use dn_store::{HEADER_COUNT_AFTER, HEADER_COUNT_BEFORE, HEADER_INSERTED_AT};
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use warp::http::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

/// Content type of conditional reads
pub(crate) const JSON_UTF8: &str = "application/json; charset=UTF-8";
/// Cache policy of conditional reads
pub(crate) const REVALIDATE: &str = "max-age=0, must-revalidate";

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn set_header(res: &mut Response, name: &str, value: &str) {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            res.headers_mut().insert(name, value);
        }
        _ => tracing::warn!(header = name, "dropping unrepresentable header"),
    }
}

/// JSON body with a status
pub(crate) fn json<T: Serialize>(code: StatusCode, body: &T) -> Response {
    warp::reply::with_status(warp::reply::json(body), code).into_response()
}

/// JSON body with status 200 and a quoted `ETag`
pub(crate) fn tagged<T: Serialize>(body: &T, tag: &str) -> Response {
    let mut res = json(StatusCode::OK, body);
    set_header(&mut res, ETAG.as_str(), &etag::quote(tag));
    res
}

/// Conditional read: 304 with an empty body, or 200 with the representation
pub(crate) fn conditional<T: Serialize>(read: Conditional<T>) -> Response {
    let mut res = match read {
        Conditional::NotModified { etag: tag } => {
            let mut res = Response::new(warp::hyper::Body::empty());
            *res.status_mut() = StatusCode::NOT_MODIFIED;
            set_header(&mut res, ETAG.as_str(), &etag::quote(&tag));
            res
        }
        Conditional::Modified {
            body,
            etag: tag,
            last_modified,
        } => {
            let mut res = json(StatusCode::OK, &body);
            set_header(&mut res, CONTENT_TYPE.as_str(), JSON_UTF8);
            set_header(&mut res, ETAG.as_str(), &etag::quote(&tag));
            if let Some(at) = last_modified {
                set_header(&mut res, LAST_MODIFIED.as_str(), &at);
            }
            res
        }
    };
    set_header(&mut res, CACHE_CONTROL.as_str(), REVALIDATE);
    res
}

/// Write result: quoted `ETag` plus the block-count telemetry headers
pub(crate) fn written<T: Serialize>(body: &T, meta: &WriteMeta) -> Response {
    let mut res = tagged(body, meta.etag.as_str());
    if let Some(before) = meta.counts.before {
        set_header(&mut res, HEADER_COUNT_BEFORE, &before.to_string());
    }
    if let Some(at) = meta.inserted_at {
        set_header(&mut res, HEADER_INSERTED_AT, &at.to_string());
    }
    if let Some(after) = meta.counts.after {
        set_header(&mut res, HEADER_COUNT_AFTER, &after.to_string());
    }
    res
}

/// `{ error, message }` with the error's status; 412 also sends the current `ETag`
pub(crate) fn operation_error(err: &OperationError) -> Response {
    let mut res = json(status(err.status()), &err.to_body());
    if let Some(current) = err.current_cid() {
        set_header(&mut res, ETAG.as_str(), &current.quoted());
    }
    res
}

/// Ability failure, rendered like an operation failure
pub(crate) fn ability_error(err: &AbilityError) -> Response {
    match err {
        AbilityError::Operation(op) => operation_error(op),
        other => json(status(other.status()), &other.to_body()),
    }
}

fn plain_error(code: StatusCode, error: &str, message: impl Into<String>) -> Response {
    let body: Value = json!({ "error": error, "message": message.into() });
    json(code, &body)
}

/// Map filter rejections to JSON errors
pub(crate) async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let res = if rejection.is_not_found() {
        plain_error(StatusCode::NOT_FOUND, "not_found", "no such route")
    } else if let Some(err) = rejection.find::<warp::body::BodyDeserializeError>() {
        plain_error(StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        plain_error(StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        plain_error(StatusCode::PAYLOAD_TOO_LARGE, "invalid_input", "body too large")
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        plain_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "invalid_input",
            "expected application/json",
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        plain_error(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "method not allowed")
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        plain_error(StatusCode::INTERNAL_SERVER_ERROR, "unknown_error", "unhandled rejection")
    };
    Ok(res)
}
