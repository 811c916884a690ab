//! Request extractors.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use sonarlink_core::{ConnectionId, Error, validation};
use validator::Validate;

use super::error::ApiError;

/// JSON body that has been decoded and validated
///
/// Decoding and validation both go through [`validation::parse`], so handlers
/// only ever see payloads that passed every field rule.
#[must_use]
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::malformed(e.body_text()))?;

        Ok(Self(validation::parse(&body)?))
    }
}

/// Connection identity taken from the `{id}` path segment
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub ConnectionId);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::malformed(e.body_text()))?;

        let id = raw
            .parse::<u64>()
            .map_err(|_| Error::malformed(format!("invalid connection id: {}", raw)))?;

        Ok(Self(ConnectionId::new(id)))
    }
}
