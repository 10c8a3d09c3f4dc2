//! Header copying between client and upstream messages.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Drop the inbound `Host`, the upstream's authority is used instead
//! - Flatten multi-valued response headers for the client
//! - Snapshot request headers for mismatch records
//!
//! # Design Decisions
//! - Multi-valued response headers are joined as `[v1,v2]` into one value.
//!   This is lossy (a value containing a comma cannot be told apart from two
//!   values) and is kept for compatibility with existing consumers.

use std::collections::BTreeMap;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive" || name.as_str() == "proxy-connection"
}

/// Headers to send upstream: everything from the client except `Host` and
/// hop-by-hop headers. Repeated values are preserved.
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if name == header::HOST || is_hop_by_hop(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers to send to the client, one value per name.
///
/// A name with several values becomes a single `[v1,v2,...]` value.
pub fn flatten_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.keys_len());
    for name in upstream.keys() {
        if is_hop_by_hop(name) {
            continue;
        }
        let values: Vec<&HeaderValue> = upstream.get_all(name).iter().collect();
        if let [single] = values.as_slice() {
            out.insert(name.clone(), (*single).clone());
            continue;
        }

        let joined = values
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect::<Vec<_>>()
            .join(",");
        match HeaderValue::from_str(&format!("[{joined}]")) {
            Ok(value) => {
                out.insert(name.clone(), value);
            }
            Err(e) => {
                tracing::warn!(header = %name, error = %e, "Dropping unrepresentable joined header");
            }
        }
    }
    out
}

/// Request header snapshot keyed by lowercase name.
pub fn snapshot(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// The `content-type` value, or an empty string when absent.
pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_headers_drop_host_and_hop_by_hop() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        inbound.append("x-tag", HeaderValue::from_static("a"));
        inbound.append("x-tag", HeaderValue::from_static("b"));

        let out = upstream_request_headers(&inbound);
        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::CONNECTION).is_none());
        assert!(out.get("keep-alive").is_none());
        assert_eq!(out.get_all("x-tag").iter().count(), 2);
    }

    #[test]
    fn single_valued_headers_pass_through() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let out = flatten_response_headers(&upstream);
        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    // Known-lossy: the joined form cannot be split back reliably.
    #[test]
    fn multi_valued_headers_are_joined_lossily() {
        let mut upstream = HeaderMap::new();
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("b=2, c=3"));

        let out = flatten_response_headers(&upstream);
        assert_eq!(out.get_all(header::SET_COOKIE).iter().count(), 1);
        assert_eq!(out.get(header::SET_COOKIE).unwrap(), "[a=1,b=2, c=3]");
    }

    #[test]
    fn snapshot_groups_values_by_name() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        let snap = snapshot(&headers);
        assert_eq!(snap["accept"], vec!["text/html", "application/json"]);
        assert_eq!(snap["x-request-id"], vec!["abc"]);
    }

    #[test]
    fn missing_content_type_is_empty() {
        assert_eq!(content_type(&HeaderMap::new()), "");
    }
}
