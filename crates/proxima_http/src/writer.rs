use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::headers::Headers;
use crate::message::{Request, Response, version_str};
use crate::HttpError;

/// Serializes a request exactly as held in `req`.
///
/// Framing headers are rewritten: the body is always sent with a
/// `Content-Length` matching the buffered bytes.
pub fn encode_request(req: &Request) -> Bytes {
    let mut out = BytesMut::with_capacity(256 + req.headers.wire_len() + req.body.len());

    out.put_slice(req.method.as_bytes());
    out.put_u8(b' ');
    out.put_slice(req.target.as_bytes());
    out.put_u8(b' ');
    out.put_slice(version_str(req.version).as_bytes());
    out.put_slice(b"\r\n");

    put_headers(&mut out, &req.headers);
    if !req.body.is_empty() || expects_body(&req.method) {
        put_header(&mut out, "Content-Length", &req.body.len().to_string());
    }
    out.put_slice(b"\r\n");
    out.put_slice(&req.body);

    out.freeze()
}

/// Serializes a response to a `request_method` request.
///
/// Bodiless statuses and answers to `HEAD` are written with their
/// headers untouched and no body; everything else gets a
/// `Content-Length` recomputed from the buffered body.
pub fn encode_response(res: &Response, request_method: &str) -> Bytes {
    let mut out = BytesMut::with_capacity(256 + res.headers.wire_len() + res.body.len());

    out.put_slice(version_str(res.version).as_bytes());
    out.put_u8(b' ');
    out.put_slice(res.status.as_str().as_bytes());
    out.put_u8(b' ');
    let reason = if res.reason.is_empty() {
        res.status.canonical_reason().unwrap_or("")
    } else {
        res.reason.as_str()
    };
    out.put_slice(reason.as_bytes());
    out.put_slice(b"\r\n");

    if res.is_bodiless() || request_method.eq_ignore_ascii_case("HEAD") {
        put_all_headers(&mut out, &res.headers);
        out.put_slice(b"\r\n");
    } else {
        put_headers(&mut out, &res.headers);
        put_header(&mut out, "Content-Length", &res.body.len().to_string());
        out.put_slice(b"\r\n");
        out.put_slice(&res.body);
    }

    out.freeze()
}

pub async fn write_response<W>(stream: &mut W, res: &Response, request_method: &str) -> Result<(), HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(&encode_response(res, request_method)).await?;
    stream.flush().await?;
    Ok(())
}

// Origins may answer 411 to an unframed POST, even an empty one.
fn expects_body(method: &str) -> bool {
    ["POST", "PUT", "PATCH"]
        .iter()
        .any(|m| method.eq_ignore_ascii_case(m))
}

/// Writes headers, leaving out the framing ones the writer owns.
fn put_headers(out: &mut BytesMut, headers: &Headers) {
    for (name, value) in headers.iter() {
        if name.eq_ignore_ascii_case("content-length")
            || name.eq_ignore_ascii_case("transfer-encoding")
        {
            continue;
        }
        put_header(out, name, value);
    }
}

fn put_all_headers(out: &mut BytesMut, headers: &Headers) {
    for (name, value) in headers.iter() {
        put_header(out, name, value);
    }
}

fn put_header(out: &mut BytesMut, name: &str, value: &str) {
    out.put_slice(name.as_bytes());
    out.put_slice(b": ");
    out.put_slice(value.as_bytes());
    out.put_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn request_line_and_length() {
        let req = Request::new("POST", "/submit")
            .with_header("Host", "example.com")
            .with_header("Transfer-Encoding", "chunked")
            .with_body(Bytes::from_static(b"abc"));
        let wire = encode_request(&req);
        let text = std::str::from_utf8(&wire).unwrap();
        assert!(text.starts_with("POST /submit HTTP/1.1\r\nHost: example.com\r\n"));
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(!text.contains("Transfer-Encoding"));
        assert!(text.ends_with("\r\n\r\nabc"));
    }

    #[test]
    fn get_without_body_has_no_length() {
        let req = Request::new("GET", "/").with_header("Host", "a");
        let text = String::from_utf8(encode_request(&req).to_vec()).unwrap();
        assert_eq!(text, "GET / HTTP/1.1\r\nHost: a\r\n\r\n");
    }

    #[test]
    fn response_keeps_header_order_and_duplicates() {
        let res = Response::new(StatusCode::OK)
            .with_header("Set-Cookie", "a=1")
            .with_header("X-One", "1")
            .with_header("Set-Cookie", "b=2")
            .with_body(Bytes::from_static(b"hi"));
        let text = String::from_utf8(encode_response(&res, "GET").to_vec()).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nX-One: 1\r\nSet-Cookie: b=2\r\nContent-Length: 2\r\n\r\nhi"
        );
    }

    #[test]
    fn not_modified_is_written_without_body() {
        let res = Response::new(StatusCode::NOT_MODIFIED).with_header("ETag", "\"x\"");
        let text = String::from_utf8(encode_response(&res, "GET").to_vec()).unwrap();
        assert_eq!(text, "HTTP/1.1 304 Not Modified\r\nETag: \"x\"\r\n\r\n");
    }

    #[test]
    fn head_answer_keeps_origin_length() {
        let res = Response::new(StatusCode::OK)
            .with_header("Content-Type", "text/plain")
            .with_header("Content-Length", "1234");
        let text = String::from_utf8(encode_response(&res, "HEAD").to_vec()).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 1234\r\n\r\n"
        );
    }
}
