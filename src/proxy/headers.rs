//! Header filtering between client, proxy and upstream.

use axum::http::{header, HeaderMap, HeaderName};

/// Headers that describe a single connection and are never passed along.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Headers to send upstream. `host` and `content-length` are left to the
/// HTTP client, which derives them from the target URL and buffered body.
pub fn request_headers(inbound: &HeaderMap) -> HeaderMap {
    filter(inbound, |name| {
        !is_hop_by_hop(name) && *name != header::HOST && *name != header::CONTENT_LENGTH
    })
}

/// Headers to relay back to the client.
pub fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    filter(upstream, |name| !is_hop_by_hop(name))
}

fn filter(headers: &HeaderMap, keep: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if keep(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
