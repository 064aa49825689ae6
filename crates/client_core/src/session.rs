//! Access-token sessions and the auth-state events derived from them.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use shared::domain::UserId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(UserIdentity),
    SignedOut,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed access token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
    #[error("access token subject '{0}' is not a user id")]
    InvalidSubject(String),
    #[error("access token expired at {0}")]
    Expired(DateTime<Utc>),
}

#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// A signed-in session. The token signature is checked by the backend on
/// every request, so only the claims are read here.
#[derive(Debug, Clone)]
pub struct AuthSession {
    access_token: String,
    identity: UserIdentity,
    expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn from_access_token(access_token: impl Into<String>) -> Result<Self, SessionError> {
        Self::from_access_token_at(access_token, Utc::now())
    }

    pub fn from_access_token_at(
        access_token: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let access_token = access_token.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<AccessTokenClaims>(
            access_token.trim(),
            &DecodingKey::from_secret(&[]),
            &validation,
        )?
        .claims;

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| SessionError::InvalidSubject(claims.sub.clone()))?;
        let expires_at = claims
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single());

        if let Some(expires_at) = expires_at {
            if expires_at <= now {
                return Err(SessionError::Expired(expires_at));
            }
        }

        Ok(Self {
            access_token: access_token.trim().to_string(),
            identity: UserIdentity {
                user_id,
                email: claims.email.filter(|e| !e.is_empty()),
            },
            expires_at,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
