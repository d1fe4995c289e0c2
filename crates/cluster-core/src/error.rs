//! Canonical error taxonomy for the cluster orchestration core.
//!
//! Every fallible operation in the control plane returns [`ClusterError`]
//! rather than a component-specific error type. This mirrors the teacher's
//! `ResilienceError<E>` approach of one error enum carrying a discriminator
//! plus typed context, except here the discriminator is the machine code the
//! wire protocol already needs (§4.9), so there is no generic application
//! error to wrap: this *is* the boundary type.

use crate::metadata::Metadata;
use std::time::Duration;
use thiserror::Error;

/// Machine-readable error kind. The HTTP status mapping is a pure function
/// of this discriminator (`ClusterErrorKind::http_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterErrorKind {
    NodeNotFound,
    QuotaExceeded,
    DrainInProgress,
    RegionUnavailable,
    CircuitOpen,
    JobNotFound,
    RateLimited,
    AuthFailed,
    BadGateway,
    Internal,
}

impl ClusterErrorKind {
    /// Machine code as it appears on the wire.
    pub fn code(self) -> &'static str {
        match self {
            ClusterErrorKind::NodeNotFound => "NODE_NOT_FOUND",
            ClusterErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ClusterErrorKind::DrainInProgress => "DRAIN_IN_PROGRESS",
            ClusterErrorKind::RegionUnavailable => "REGION_UNAVAILABLE",
            ClusterErrorKind::CircuitOpen => "CIRCUIT_OPEN",
            ClusterErrorKind::JobNotFound => "JOB_NOT_FOUND",
            ClusterErrorKind::RateLimited => "RATE_LIMITED",
            ClusterErrorKind::AuthFailed => "AUTH_FAILED",
            ClusterErrorKind::BadGateway => "BAD_GATEWAY",
            ClusterErrorKind::Internal => "INTERNAL",
        }
    }

    /// HTTP status this kind maps to (§4.9).
    pub fn http_status(self) -> u16 {
        match self {
            ClusterErrorKind::NodeNotFound => 404,
            ClusterErrorKind::QuotaExceeded => 429,
            ClusterErrorKind::DrainInProgress => 409,
            ClusterErrorKind::RegionUnavailable => 503,
            ClusterErrorKind::CircuitOpen => 503,
            ClusterErrorKind::JobNotFound => 404,
            ClusterErrorKind::RateLimited => 429,
            ClusterErrorKind::AuthFailed => 401,
            ClusterErrorKind::BadGateway => 502,
            ClusterErrorKind::Internal => 500,
        }
    }
}

/// A structured, categorized error carried from any component up through the
/// gateway boundary. Wire shape: `{code, message, metadata}` (§4.9, §6).
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ClusterError {
    pub kind: ClusterErrorKind,
    pub message: String,
    pub metadata: Metadata,
    /// Present only for `RateLimited` and `CircuitOpen`; becomes the
    /// `Retry-After` response header.
    pub retry_after: Option<Duration>,
}

impl ClusterError {
    pub fn new(kind: ClusterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            metadata: Metadata::empty(),
            retry_after: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        Self::new(
            ClusterErrorKind::NodeNotFound,
            format!("node '{node_id}' is not registered"),
        )
        .with_metadata(Metadata::from_pairs([("nodeId", node_id.into())]))
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ClusterErrorKind::QuotaExceeded, message)
    }

    pub fn drain_in_progress(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        Self::new(
            ClusterErrorKind::DrainInProgress,
            format!("node '{node_id}' is draining"),
        )
        .with_metadata(Metadata::from_pairs([("nodeId", node_id.into())]))
    }

    pub fn region_unavailable(region: impl Into<String>) -> Self {
        let region = region.into();
        Self::new(
            ClusterErrorKind::RegionUnavailable,
            format!("no nodes available in region '{region}'"),
        )
        .with_metadata(Metadata::from_pairs([("region", region.into())]))
    }

    pub fn circuit_open(node_id: impl Into<String>, retry_after: Duration) -> Self {
        let node_id = node_id.into();
        Self::new(
            ClusterErrorKind::CircuitOpen,
            format!("circuit for node '{node_id}' is open"),
        )
        .with_metadata(Metadata::from_pairs([("nodeId", node_id.into())]))
        .with_retry_after(retry_after)
    }

    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        let job_id = job_id.into();
        Self::new(
            ClusterErrorKind::JobNotFound,
            format!("job '{job_id}' is not tracked"),
        )
        .with_metadata(Metadata::from_pairs([("jobId", job_id.into())]))
    }

    pub fn rate_limited(rule_id: impl Into<String>, retry_after: Duration) -> Self {
        let rule_id = rule_id.into();
        Self::new(ClusterErrorKind::RateLimited, "rate limit exceeded")
            .with_metadata(Metadata::from_pairs([("ruleId", rule_id.into())]))
            .with_retry_after(retry_after)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(ClusterErrorKind::AuthFailed, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ClusterErrorKind::BadGateway, message)
    }

    pub fn internal(correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        Self::new(ClusterErrorKind::Internal, "internal error")
            .with_metadata(Metadata::from_pairs([(
                "correlationId",
                correlation_id.into(),
            )]))
    }
}

#[cfg(feature = "axum")]
mod axum_support {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};

    impl IntoResponse for ClusterError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.kind.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = serde_json::json!({
                "code": self.kind.code(),
                "message": self.message,
                "metadata": self.metadata.as_value(),
            });
            let mut response = (status, axum::Json(body)).into_response();
            if let Some(retry_after) = self.retry_after {
                let secs = retry_after.as_secs().max(if retry_after.is_zero() { 0 } else { 1 });
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert("Retry-After", value);
                }
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_taxonomy() {
        assert_eq!(ClusterErrorKind::NodeNotFound.http_status(), 404);
        assert_eq!(ClusterErrorKind::QuotaExceeded.http_status(), 429);
        assert_eq!(ClusterErrorKind::DrainInProgress.http_status(), 409);
        assert_eq!(ClusterErrorKind::RegionUnavailable.http_status(), 503);
        assert_eq!(ClusterErrorKind::CircuitOpen.http_status(), 503);
        assert_eq!(ClusterErrorKind::JobNotFound.http_status(), 404);
        assert_eq!(ClusterErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ClusterErrorKind::AuthFailed.http_status(), 401);
        assert_eq!(ClusterErrorKind::BadGateway.http_status(), 502);
        assert_eq!(ClusterErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let err = ClusterError::rate_limited("r1", Duration::from_millis(800));
        assert_eq!(err.kind, ClusterErrorKind::RateLimited);
        assert_eq!(err.retry_after, Some(Duration::from_millis(800)));
    }
}
