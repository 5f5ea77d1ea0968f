//! Bearer-token identity: HS256 JWTs whose `sub` is the user id.

use std::time::Duration;

use axum::http::{header, HeaderMap};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use mentora_core::identity::{IdentityError, IdentityVerifier};
use mentora_core::ids::UserId;
use mentora_settings::AuthSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Without a configured secret a random one is used, so no token
    /// issued elsewhere will verify.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        match settings.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret),
            None => {
                warn!("no JWT secret configured; every bearer token will be rejected");
                Self::new(&Uuid::now_v7().to_string())
            }
        }
    }

    /// Sign a token for `user` valid for `ttl`.
    pub fn issue(&self, user: &UserId, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.to_string(),
            exp: now.saturating_add(ttl),
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<UserId, IdentityError> {
        let data = decode::<Claims>(credential, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => IdentityError::Expired,
            _ => IdentityError::Invalid(e.to_string()),
        })?;
        if data.claims.sub.is_empty() {
            return Err(IdentityError::Invalid("empty subject".into()));
        }
        Ok(UserId::from_raw(data.claims.sub))
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
