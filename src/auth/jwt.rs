use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::RngCore;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::jwt::{Claims, Scope},
    state::AppState,
};

const SECRET_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("unexpected token scope {0:?}")]
    WrongScope(Scope),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Signs and verifies credentials with a secret owned by this value.
/// Credentials signed by one codec never verify under another.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Fresh secret from the OS RNG.
    pub fn with_random_secret() -> Self {
        let mut secret = [0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self::from_secret(&secret)
    }

    pub fn issue(&self, subject: &str, scope: Scope, ttl: Duration) -> Result<String, CodecError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| CodecError::Encoding(format!("ttl {ttl} out of range")))?;
        let claims = Claims {
            sub: subject.to_string(),
            scope,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Signature and expiry only; any scope is accepted.
    pub fn decode(&self, token: &str) -> Result<Claims, CodecError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CodecError::Expired,
                _ => CodecError::Malformed,
            })
    }

    pub fn verify(&self, token: &str, expected: Scope) -> Result<Claims, CodecError> {
        let claims = self.decode(token)?;
        if claims.scope != expected {
            return Err(CodecError::WrongScope(claims.scope));
        }
        Ok(claims)
    }
}

/// Subject of a valid access token taken from `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub struct AuthSubject(pub String);

impl FromRequestParts<Arc<AppState>> for AuthSubject {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::InvalidAccess)?;

        let subject = state.authority.subject_from_access_token(bearer.token())?;
        Ok(Self(subject))
    }
}
