//! HTTP error responses for the connection API.
//!
//! [`ApiError`] wraps a [`sonarlink_core::Error`] and decides the status code
//! and JSON body the client sees. Internal failures are logged in full and
//! reported with a generic message.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sonarlink_core::Error;
use sonarlink_core::validation::field_messages;

/// Result type for handlers
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError(Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) | Error::Malformed(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Connectivity(_) => StatusCode::BAD_GATEWAY,
            // Only upstream client and server error codes are echoed
            Error::UnexpectedStatus { status } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn name(&self) -> &'static str {
        match &self.0 {
            Error::Validation(_) => "validation_failed",
            Error::Malformed(_) => "malformed_payload",
            Error::Conflict(_) => "conflict",
            Error::NotFound(_) => "not_found",
            Error::Connectivity(_) => "upstream_unreachable",
            Error::UnexpectedStatus { .. } => "unexpected_upstream_status",
            _ => "internal_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// JSON body of an error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    name: &'static str,
    message: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() && !self.0.is_probe_failure() {
            tracing::error!("Request failed: {}", self.0);
            "An internal server error occurred. Please try again later".to_string()
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
            self.0.to_string()
        };

        let (upstream_status, fields) = match &self.0 {
            Error::UnexpectedStatus { status } => (Some(*status), None),
            Error::Validation(errors) => (None, Some(field_messages(errors))),
            _ => (None, None),
        };

        let body = ErrorBody {
            name: self.name(),
            message,
            status: status.as_u16(),
            upstream_status,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::malformed("bad json"), StatusCode::BAD_REQUEST),
            (Error::conflict("sonar"), StatusCode::CONFLICT),
            (Error::not_found("connection 1"), StatusCode::NOT_FOUND),
            (Error::connectivity("refused"), StatusCode::BAD_GATEWAY),
            (Error::unexpected_status(401), StatusCode::UNAUTHORIZED),
            (Error::unexpected_status(503), StatusCode::SERVICE_UNAVAILABLE),
            (Error::store("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_invalid_upstream_status_becomes_bad_gateway() {
        let err = ApiError::from(Error::unexpected_status(42));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_non_error_upstream_status_becomes_bad_gateway() {
        for code in [101, 201, 204, 302] {
            let response = ApiError::from(Error::unexpected_status(code)).into_response();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "upstream {}", code);
        }
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let response = ApiError::from(Error::store("/var/lib/secret/path")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
