//! Token decoding and signature verification.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use audioforge_core::UserId;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Wire-level claims as they appear inside the token (registered claim names,
/// second-precision timestamps).
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

/// HS256 validator over a shared secret.
pub struct Hs256JwtValidator {
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time-window checks are done deterministically against the caller's
        // `now` in validate_claims, not by the decoder.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        Self {
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenValidationError::Invalid)?;

        let issued_at = Utc
            .timestamp_opt(data.claims.iat, 0)
            .single()
            .ok_or(TokenValidationError::Invalid)?;
        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or(TokenValidationError::Invalid)?;

        let claims = JwtClaims {
            sub: UserId::from_uuid(data.claims.sub),
            issued_at,
            expires_at,
        };
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

/// Mint a token for the given claims (dev/test helper; the production issuer
/// is an external identity service).
pub fn issue_hs256(
    secret: impl AsRef<[u8]>,
    claims: &JwtClaims,
) -> Result<String, jsonwebtoken::errors::Error> {
    let wire = WireClaims {
        sub: *claims.sub.as_uuid(),
        iat: claims.issued_at.timestamp(),
        exp: claims.expires_at.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &wire,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}
