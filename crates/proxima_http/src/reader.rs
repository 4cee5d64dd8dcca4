//! HTTP/1.x message reader.
//!
//! Reads one request or response from a stream into memory:
//! 1) reads until the head is complete and parses it with `httparse`
//! 2) picks the body framing (Content-Length, chunked, read-to-EOF, none)
//! 3) buffers the whole body, decoding chunked framing on the way
//!
//! Every socket read is bounded by `ReadLimits::timeout`.

use bytes::{Buf, Bytes, BytesMut};
use http::{StatusCode, Version};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Duration, timeout};
use tracing::{debug, instrument, warn};

use crate::headers::Headers;
use crate::message::{Request, Response, status_is_bodiless};
use crate::HttpError;

const MAX_HEADER_COUNT: usize = 128;

/// Size and time bounds applied while reading one message.
///
/// A limit of 0 means "unbounded".
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub max_headers: usize,
    pub max_body: usize,
    pub timeout: Duration,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_headers: 64 * 1024,
            max_body: 10 * 1024 * 1024,
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

/// Reads one request.
///
/// Returns `Ok(None)` when the peer closes before sending a single byte.
/// Bytes past the end of the message stay in `buf`.
#[instrument(skip(stream, buf, limits))]
pub async fn read_request<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    limits: &ReadLimits,
) -> Result<Option<Request>, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let head_len = loop {
        if let Some(len) = request_head_len(buf)? {
            break len;
        }
        check_head_size(buf, limits)?;
        if fill(stream, buf, limits.timeout).await? == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(HttpError::Closed);
        }
    };

    let (method, target, version, headers) = parse_request_head(&buf[..head_len])?;
    buf.advance(head_len);

    debug!(
        target: "proxima::http",
        method = %method,
        uri = %target,
        header_count = headers.len(),
        "Parsed request head"
    );

    let framing = request_framing(&headers)?;
    let body = read_body(stream, buf, framing, limits).await?;

    Ok(Some(Request {
        method,
        target,
        version,
        headers,
        body,
    }))
}

/// Reads one response to a request made with `request_method`.
///
/// Responses to `HEAD` and 1xx/204/304 responses carry no body.
#[instrument(skip(stream, buf, limits))]
pub async fn read_response<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    request_method: &str,
    limits: &ReadLimits,
) -> Result<Response, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let head_len = loop {
        if let Some(len) = response_head_len(buf)? {
            break len;
        }
        check_head_size(buf, limits)?;
        if fill(stream, buf, limits.timeout).await? == 0 {
            return Err(HttpError::Closed);
        }
    };

    let (version, status, reason, headers) = parse_response_head(&buf[..head_len])?;
    buf.advance(head_len);

    debug!(
        target: "proxima::http",
        status = status.as_u16(),
        header_count = headers.len(),
        "Parsed response head"
    );

    let framing = if request_method.eq_ignore_ascii_case("HEAD") || status_is_bodiless(status) {
        BodyFraming::Empty
    } else {
        response_framing(&headers)?
    };
    let body = read_body(stream, buf, framing, limits).await?;

    Ok(Response {
        version,
        status,
        reason,
        headers,
        body,
    })
}

fn check_head_size(buf: &BytesMut, limits: &ReadLimits) -> Result<(), HttpError> {
    if limits.max_headers > 0 && buf.len() > limits.max_headers {
        return Err(HttpError::HeadersTooLarge);
    }
    Ok(())
}

fn request_head_len(buf: &[u8]) -> Result<Option<usize>, HttpError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => Ok(Some(len)),
        Ok(httparse::Status::Partial) => Ok(None),
        Err(e) => Err(HttpError::Malformed(e.to_string())),
    }
}

fn response_head_len(buf: &[u8]) -> Result<Option<usize>, HttpError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut res = httparse::Response::new(&mut headers);
    match res.parse(buf) {
        Ok(httparse::Status::Complete(len)) => Ok(Some(len)),
        Ok(httparse::Status::Partial) => Ok(None),
        Err(e) => Err(HttpError::Malformed(e.to_string())),
    }
}

fn parse_request_head(head: &[u8]) -> Result<(String, String, Version, Headers), HttpError> {
    let mut raw = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut req = httparse::Request::new(&mut raw);
    req.parse(head)
        .map_err(|e| HttpError::Malformed(e.to_string()))?;

    let method = req
        .method
        .ok_or_else(|| HttpError::Malformed("missing method".into()))?
        .to_string();
    let target = req
        .path
        .ok_or_else(|| HttpError::Malformed("missing request target".into()))?
        .to_string();
    let version = map_version(req.version);

    Ok((method, target, version, collect_headers(req.headers)))
}

fn parse_response_head(head: &[u8]) -> Result<(Version, StatusCode, String, Headers), HttpError> {
    let mut raw = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut res = httparse::Response::new(&mut raw);
    res.parse(head)
        .map_err(|e| HttpError::Malformed(e.to_string()))?;

    let code = res
        .code
        .ok_or_else(|| HttpError::Malformed("missing status code".into()))?;
    let status = StatusCode::from_u16(code)
        .map_err(|_| HttpError::Malformed(format!("invalid status code {code}")))?;
    let reason = res.reason.unwrap_or("").to_string();

    Ok((map_version(res.version), status, reason, collect_headers(res.headers)))
}

fn collect_headers(raw: &[httparse::Header<'_>]) -> Headers {
    raw.iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).trim().to_string(),
            )
        })
        .collect()
}

fn map_version(version: Option<u8>) -> Version {
    match version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    }
}

fn request_framing(headers: &Headers) -> Result<BodyFraming, HttpError> {
    if headers.has_token("transfer-encoding", "chunked") {
        return Ok(BodyFraming::Chunked);
    }
    match content_length(headers)? {
        Some(0) | None => Ok(BodyFraming::Empty),
        Some(len) => Ok(BodyFraming::Length(len)),
    }
}

fn response_framing(headers: &Headers) -> Result<BodyFraming, HttpError> {
    if headers.has_token("transfer-encoding", "chunked") {
        return Ok(BodyFraming::Chunked);
    }
    match content_length(headers)? {
        Some(0) => Ok(BodyFraming::Empty),
        Some(len) => Ok(BodyFraming::Length(len)),
        None => Ok(BodyFraming::UntilClose),
    }
}

/// Parses `Content-Length`, accepting repeated identical values
/// and rejecting conflicting or non-numeric ones.
fn content_length(headers: &Headers) -> Result<Option<usize>, HttpError> {
    let mut value: Option<usize> = None;
    for raw in headers.get_all("content-length") {
        for part in raw.split(',') {
            let part = part.trim();
            let len = part
                .parse::<usize>()
                .map_err(|_| HttpError::Malformed(format!("invalid Content-Length '{part}'")))?;
            match value {
                Some(prev) if prev != len => {
                    return Err(HttpError::Malformed("conflicting Content-Length".into()));
                }
                _ => value = Some(len),
            }
        }
    }
    Ok(value)
}

async fn read_body<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    framing: BodyFraming,
    limits: &ReadLimits,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match framing {
        BodyFraming::Empty => Ok(Bytes::new()),
        BodyFraming::Length(len) => {
            if limits.max_body > 0 && len > limits.max_body {
                return Err(HttpError::BodyTooLarge);
            }
            read_exact(stream, buf, len, limits.timeout).await
        }
        BodyFraming::Chunked => read_chunked(stream, buf, limits).await,
        BodyFraming::UntilClose => read_to_close(stream, buf, limits).await,
    }
}

async fn read_exact<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    len: usize,
    read_timeout: Duration,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    while buf.len() < len {
        if fill(stream, buf, read_timeout).await? == 0 {
            warn!(
                target: "proxima::http",
                expected = len,
                got = buf.len(),
                "Peer closed before full body was read"
            );
            return Err(HttpError::Closed);
        }
    }
    Ok(buf.split_to(len).freeze())
}

async fn read_chunked<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    limits: &ReadLimits,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut body = BytesMut::new();

    loop {
        let line = read_line(stream, buf, limits).await?;
        let size_str = line.split(';').next().unwrap_or("").trim();
        let chunk_size = usize::from_str_radix(size_str, 16)
            .map_err(|_| HttpError::Malformed(format!("invalid chunk size '{size_str}'")))?;

        if chunk_size == 0 {
            // trailers are read and dropped
            loop {
                if read_line(stream, buf, limits).await?.is_empty() {
                    return Ok(body.freeze());
                }
            }
        }

        if limits.max_body > 0 && body.len().saturating_add(chunk_size) > limits.max_body {
            return Err(HttpError::BodyTooLarge);
        }

        let framed_len = chunk_size
            .checked_add(2)
            .ok_or_else(|| HttpError::Malformed(format!("chunk size '{size_str}' out of range")))?;
        let chunk = read_exact(stream, buf, framed_len, limits.timeout).await?;
        if &chunk[chunk_size..] != b"\r\n" {
            return Err(HttpError::Malformed("chunk not terminated by CRLF".into()));
        }
        body.extend_from_slice(&chunk[..chunk_size]);
    }
}

async fn read_to_close<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    limits: &ReadLimits,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        if limits.max_body > 0 && buf.len() > limits.max_body {
            return Err(HttpError::BodyTooLarge);
        }
        if fill(stream, buf, limits.timeout).await? == 0 {
            break;
        }
    }
    debug!(
        target: "proxima::http",
        body_len = buf.len(),
        "No Content-Length; read until EOF"
    );
    Ok(buf.split().freeze())
}

/// Reads one CRLF-terminated line and returns it without the terminator.
async fn read_line<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    limits: &ReadLimits,
) -> Result<String, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        if let Some(end) = find_crlf(buf) {
            let line = buf.split_to(end + 2);
            return Ok(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        check_head_size(buf, limits)?;
        if fill(stream, buf, limits.timeout).await? == 0 {
            return Err(HttpError::Closed);
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

async fn fill<R>(stream: &mut R, buf: &mut BytesMut, read_timeout: Duration) -> Result<usize, HttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut tmp = [0u8; 4096];
    match timeout(read_timeout, stream.read(&mut tmp)).await {
        Ok(res) => {
            let n = res?;
            buf.extend_from_slice(&tmp[..n]);
            Ok(n)
        }
        Err(_) => Err(HttpError::Timeout),
    }
}
