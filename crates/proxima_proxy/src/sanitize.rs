use proxima_http::{Headers, Request, Response};

/// Headers that describe one transport hop and are never relayed.
pub const HOP_BY_HOP: [&str; 8] = [
    "Content-Length",
    "Transfer-Encoding",
    "Connection",
    "Keep-Alive",
    "TE",
    "Trailers",
    "Upgrade",
    "Proxy-Authenticate",
];

/// Removes the hop-by-hop set plus any header the `Connection`
/// header nominates. Applying it twice changes nothing.
pub fn strip_hop_by_hop(headers: &mut Headers) {
    let nominated: Vec<String> = headers
        .tokens("connection")
        .map(str::to_string)
        .collect();

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    for name in &nominated {
        headers.remove(name);
    }
}

/// Outbound side: also drops `Accept-Encoding` so bodies come back uncompressed.
pub fn sanitize_request(req: &mut Request) {
    strip_hop_by_hop(&mut req.headers);
    req.headers.remove("accept-encoding");
}

pub fn sanitize_response(res: &mut Response) {
    strip_hop_by_hop(&mut res.headers);
}
