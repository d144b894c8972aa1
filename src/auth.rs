//! Bearer-token principal extraction.
//!
//! The identity context is external: every request arrives with a signed
//! JWT bearer token carrying the authenticated principal
//! `{userId, condoId, role}`. This module verifies the signature (HS256)
//! and exposes the principal to handlers through an axum extractor. No
//! session state is kept here; the token is the principal.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::domain::{CondoId, UserId};
use crate::error::MarketError;

/// Role carried by the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular condominium resident.
    Resident,
    /// Condominium administrator (moderation console, out of scope here).
    Admin,
}

/// Authenticated principal attached to every request.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    /// The authenticated resident.
    pub user_id: UserId,
    /// Condominium the resident belongs to.
    pub condo_id: CondoId,
    /// Role granted by the identity context.
    pub role: Role,
}

/// JWT claims issued by the identity context.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: uuid::Uuid,
    /// Condominium id.
    condo_id: uuid::Uuid,
    /// Role string.
    role: Role,
    /// Expiry (seconds since epoch).
    exp: i64,
}

/// Verifies bearer tokens against the shared identity-context secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Creates a verifier from the shared HMAC secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Verifies a token and returns the embedded principal.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] if the token is malformed,
    /// expired, or signed with a different secret.
    pub fn verify(&self, token: &str) -> Result<Principal, MarketError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| MarketError::Unauthorized(e.to_string()))?;
        Ok(Principal {
            user_id: UserId::from_uuid(data.claims.sub),
            condo_id: CondoId::from_uuid(data.claims.condo_id),
            role: data.claims.role,
        })
    }

    /// Issues a token for the given principal, valid for `ttl_secs`.
    ///
    /// In production tokens are minted by the identity context; this is
    /// used by tests and local tooling.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Internal`] if signing fails.
    pub fn issue(&self, principal: &Principal, ttl_secs: i64) -> Result<String, MarketError> {
        let claims = Claims {
            sub: (*principal.user_id.as_uuid()),
            condo_id: (*principal.condo_id.as_uuid()),
            role: principal.role,
            exp: Utc::now().timestamp() + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| MarketError::Internal(e.to_string()))
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = MarketError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .ok_or_else(|| {
                MarketError::Unauthorized("Authorization header with Bearer token required".into())
            })?;

        state.verifier.verify(token)
    }
}
