//! `audioforge-auth`: authentication boundary.
//!
//! Session/account management is an external collaborator; this crate only
//! verifies bearer tokens and exposes the authenticated user identity.

pub mod claims;
pub mod validator;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use validator::{Hs256JwtValidator, JwtValidator, issue_hs256};
