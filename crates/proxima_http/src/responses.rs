use std::time::SystemTime;

use bytes::Bytes;
use http::StatusCode;

use crate::message::Response;

pub const SERVER_NAME: &str = concat!("proxima/", env!("CARGO_PKG_VERSION"));

/// Plain-text response for an error status, e.g. `500 Internal Server Error\n`.
pub fn error_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    text_response(status, format!("{} {reason}\n", status.as_str()))
}

pub fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
    Response::new(status)
        .with_header("Content-Type", "text/plain; charset=utf-8")
        .with_body(Bytes::from(body.into()))
}

pub fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    Response::new(status)
        .with_header("Content-Type", "application/json")
        .with_body(Bytes::from(body))
}

pub fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Adds `Date` and `Server` to a response bound for a client,
/// leaving values the origin already set untouched.
pub fn stamp(res: &mut Response) {
    res.headers
        .set_if_absent("Date", httpdate::fmt_http_date(SystemTime::now()));
    res.headers.set_if_absent("Server", SERVER_NAME);
}
