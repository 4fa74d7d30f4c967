use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use crates::domain::value_objects::principal::Principal;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bearer token claims. `sub` carries the caller principal in textual form.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub struct JwtKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

pub fn validate_jwt(token: &str, keys: &JwtKeys) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(token, &keys.decoding, &keys.validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

/// The calling principal. Requests without an `Authorization` header are made by the
/// anonymous principal; a header that is present must carry a valid token.
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub principal: Principal,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(AuthPrincipal {
                principal: Principal::anonymous(),
            });
        };

        let auth_str = auth_header.to_str().map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            )
        })?;

        let token = auth_str.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format".to_string(),
        ))?;

        let keys = parts.extensions.get::<Arc<JwtKeys>>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication is not configured".to_string(),
        ))?;

        let claims = validate_jwt(token, keys).map_err(|e| {
            warn!(error = %e, "auth: rejected bearer token");
            (StatusCode::UNAUTHORIZED, e.to_string())
        })?;

        let principal = Principal::parse(&claims.sub).map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid principal in token".to_string(),
            )
        })?;

        Ok(AuthPrincipal { principal })
    }
}
