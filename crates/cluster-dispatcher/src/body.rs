//! Outbound body handling (§4.7 step 5, §9 "Coroutine-style async").
//!
//! The dispatcher must not buffer a large body fully when it can stream it
//! instead — but a streamed body can only be sent once, so it disables
//! retry for that request. A body that fits under `maxReplayBytes` is
//! buffered instead, which both lets it stream to the worker and lets the
//! dispatcher resend the exact same bytes on failover. Bodies whose declared
//! `Content-Length` exceeds the cap (or that carry no length at all, i.e.
//! chunked transfer) are conservatively treated as non-replayable and
//! streamed through untouched (§9 Open Question: retry beyond the cap is
//! disabled outright, not partially buffered).

use bytes::Bytes;

pub enum RequestBody {
    Empty,
    Buffered(Bytes),
    Streaming(axum::body::Body),
}

impl RequestBody {
    pub fn is_replayable(&self) -> bool {
        matches!(self, RequestBody::Empty | RequestBody::Buffered(_))
    }
}

pub async fn prepare_body(
    method: &http::Method,
    body: axum::body::Body,
    content_length: Option<u64>,
    max_replay_bytes: usize,
) -> Result<RequestBody, axum::Error> {
    if method == http::Method::GET || method == http::Method::HEAD {
        return Ok(RequestBody::Empty);
    }
    let fits_replay_cap = content_length.is_some_and(|len| (len as usize) <= max_replay_bytes);
    if fits_replay_cap {
        let bytes = axum::body::to_bytes(body, max_replay_bytes).await?;
        Ok(RequestBody::Buffered(bytes))
    } else {
        Ok(RequestBody::Streaming(body))
    }
}

pub fn into_reqwest_body(body: RequestBody) -> reqwest::Body {
    match body {
        RequestBody::Empty => reqwest::Body::from(Vec::new()),
        RequestBody::Buffered(bytes) => reqwest::Body::from(bytes),
        RequestBody::Streaming(body) => reqwest::Body::wrap_stream(body.into_data_stream()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_requests_carry_no_body() {
        let body = prepare_body(&http::Method::GET, axum::body::Body::empty(), None, 1024)
            .await
            .unwrap();
        assert!(matches!(body, RequestBody::Empty));
        assert!(body.is_replayable());
    }

    #[tokio::test]
    async fn small_body_is_buffered_and_replayable() {
        let body = prepare_body(
            &http::Method::POST,
            axum::body::Body::from("hello"),
            Some(5),
            1024,
        )
        .await
        .unwrap();
        assert!(matches!(body, RequestBody::Buffered(ref b) if b.as_ref() == b"hello"));
        assert!(body.is_replayable());
    }

    #[tokio::test]
    async fn oversized_body_streams_and_disables_replay() {
        let body = prepare_body(
            &http::Method::POST,
            axum::body::Body::from(vec![0u8; 2048]),
            Some(2048),
            1024,
        )
        .await
        .unwrap();
        assert!(matches!(body, RequestBody::Streaming(_)));
        assert!(!body.is_replayable());
    }

    #[tokio::test]
    async fn unknown_length_streams_and_disables_replay() {
        let body = prepare_body(&http::Method::POST, axum::body::Body::from("x"), None, 1024)
            .await
            .unwrap();
        assert!(!body.is_replayable());
    }
}
