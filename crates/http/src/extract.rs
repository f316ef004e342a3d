//! Request extractors: authenticated caller and body decoding.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Form, Json,
};
use serde::de::DeserializeOwned;

use biblio_authz::{Caller, TokenAuthenticator};

use crate::error::AppError;

/// Caller extracted from an `Authorization: Bearer` header.
///
/// Rejects with 401 before the handler body runs, so protected operations
/// never see an unauthenticated request.
pub struct Authenticated(pub Caller);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = parts
            .extensions
            .get::<Arc<TokenAuthenticator>>()
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("token authenticator not configured"))
            })?;

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer credential"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("authorization header is not a bearer credential"))?;

        let caller = authenticator
            .authenticate(token)
            .ok_or_else(|| AppError::unauthorized("unknown bearer credential"))?;

        Ok(Self(caller))
    }
}

/// Request body accepted as either JSON or form-urlencoded.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|err| AppError::bad_request(format!("malformed form body: {err}")))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|err| AppError::bad_request(format!("malformed json body: {err}")))?;
            Ok(Self(value))
        }
    }
}
