//! Caller identity from `Authorization: Bearer <jwt>` headers.
//!
//! Tokens are HS256 JWTs issued by the identity provider; the `sub`
//! claim carries the user's UUID. A missing, malformed or expired token
//! never fails a request here: the caller is simply anonymous, and
//! endpoints that need a user reject anonymous contexts themselves.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use gather_core::RequestContext;
use gather_core::config::AuthSection;
use gather_types::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::AppState;

/// JWT claims read from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID.
    pub sub: String,
    /// Expiration as a Unix timestamp.
    pub exp: i64,
    /// Issuer, when the provider sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Why a bearer token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Signature, expiry, issuer or audience check failed.
    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The `sub` claim is not a UUID.
    #[error("invalid subject: {0}")]
    Subject(#[from] uuid::Error),
}

/// Verifies HS256 bearer tokens against a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Build a verifier. `issuer` and `audience` are checked only when set.
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Build a verifier from the `auth` config section.
    ///
    /// Returns `None` when no secret is configured.
    pub fn from_section(section: &AuthSection) -> Option<Self> {
        if section.jwt_secret.is_empty() {
            return None;
        }
        Some(Self::new(
            &section.jwt_secret,
            section.issuer.as_deref(),
            section.audience.as_deref(),
        ))
    }

    /// Verify a token and return the user it identifies.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the token fails verification or its
    /// subject is not a UUID.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims.sub.parse::<UserId>()?)
    }
}

/// Extract the token from an `Authorization` header.
///
/// Accepts both `Bearer <token>` and a bare token. The scheme name is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => raw,
    };
    (!token.is_empty()).then_some(token)
}

/// Resolve the caller's identity from request headers.
pub fn request_context(headers: &HeaderMap, verifier: Option<&JwtVerifier>) -> RequestContext {
    let (Some(verifier), Some(token)) = (verifier, bearer_token(headers)) else {
        return RequestContext::anonymous();
    };
    match verifier.verify(token) {
        Ok(user_id) => RequestContext::authenticated(user_id),
        Err(e) => {
            debug!(error = %e, "Ignoring invalid bearer token");
            RequestContext::anonymous()
        }
    }
}

/// Extractor yielding the caller's [`RequestContext`].
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub RequestContext);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(request_context(&parts.headers, state.auth.as_ref())))
    }
}
