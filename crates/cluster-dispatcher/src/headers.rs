//! Header rewriting for forwarded requests and responses (§4.7 step 4, 6).

use http::{HeaderMap, HeaderName, HeaderValue};

/// Headers that belong to the hop to the orchestrator, not the hop onward to
/// the worker node, and vice versa on the way back (§4.7).
const HOP_BY_HOP: &[&str] = ["transfer-encoding", "content-encoding", "host"].as_slice();

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Builds the outbound request's extra headers (§4.7 step 4 /
/// §6 "Forwarding headers").
pub fn forwarding_headers(client_ip: Option<&str>, proto: &str, host: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-by", HeaderValue::from_static("orchestrator"));
    if let Some(ip) = client_ip {
        if let Ok(value) = HeaderValue::from_str(ip) {
            headers.insert("x-forwarded-for", value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(proto) {
        headers.insert("x-forwarded-proto", value);
    }
    if let Ok(value) = HeaderValue::from_str(host) {
        headers.insert("x-forwarded-host", value);
    }
    headers
}

/// `X-Served-By: cluster:<nodeName>` (§4.7 step 6, §6).
pub fn served_by(node_name: &str) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&format!("cluster:{node_name}"))
        .unwrap_or_else(|_| HeaderValue::from_static("cluster:unknown"));
    (HeaderName::from_static("x-served-by"), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("content-encoding", HeaderValue::from_static("gzip"));
        headers.insert("host", HeaderValue::from_static("example.com"));
        headers.insert("x-custom", HeaderValue::from_static("keep-me"));
        strip_hop_by_hop(&mut headers);
        assert!(!headers.contains_key("transfer-encoding"));
        assert!(!headers.contains_key("content-encoding"));
        assert!(!headers.contains_key("host"));
        assert!(headers.contains_key("x-custom"));
    }

    #[test]
    fn served_by_formats_node_name() {
        let (name, value) = served_by("worker-3");
        assert_eq!(name.as_str(), "x-served-by");
        assert_eq!(value.to_str().unwrap(), "cluster:worker-3");
    }
}
