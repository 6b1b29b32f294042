//! Stateless password reset tokens.
//!
//! A token is an HS256 JWT over `{sub, iat, exp, kind}`. Nothing is stored
//! server side: the signature makes the capsule tamper evident and the
//! issue time makes it expire. Changing the secret invalidates every
//! outstanding token.

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{ResetClaims, TokenKind};
use crate::error::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResetTokenError {
    #[error("reset token is malformed")]
    Malformed,
    #[error("reset token signature does not match")]
    BadSignature,
    #[error("reset token has expired")]
    Expired,
    #[error("token is not a password reset token")]
    WrongPurpose,
}

impl From<ResetTokenError> for AppError {
    fn from(e: ResetTokenError) -> Self {
        match e {
            ResetTokenError::Expired => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

pub fn issue_reset_token(user_id: Uuid, secret: &[u8], ttl: Duration) -> anyhow::Result<String> {
    issue_reset_token_at(user_id, secret, ttl, OffsetDateTime::now_utc())
}

pub(crate) fn issue_reset_token_at(
    user_id: Uuid,
    secret: &[u8],
    ttl: Duration,
    issued_at: OffsetDateTime,
) -> anyhow::Result<String> {
    let claims = ResetClaims {
        sub: user_id,
        iat: issued_at.unix_timestamp(),
        exp: (issued_at + ttl).unix_timestamp(),
        kind: TokenKind::PasswordReset,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?;
    debug!(user_id = %user_id, "reset token issued");
    Ok(token)
}

/// Returns the user id carried by `token` if it was signed with `secret`
/// and is no older than `ttl`.
pub fn verify_reset_token(
    token: &str,
    secret: &[u8],
    ttl: Duration,
) -> Result<Uuid, ResetTokenError> {
    verify_reset_token_at(token, secret, ttl, OffsetDateTime::now_utc())
}

pub(crate) fn verify_reset_token_at(
    token: &str,
    secret: &[u8],
    ttl: Duration,
    now: OffsetDateTime,
) -> Result<Uuid, ResetTokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Age is checked below against the ttl the caller passes in.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["sub"]);

    let data = decode::<ResetClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => ResetTokenError::BadSignature,
            _ => ResetTokenError::Malformed,
        })?;
    let claims = data.claims;

    if claims.kind != TokenKind::PasswordReset {
        return Err(ResetTokenError::WrongPurpose);
    }

    let age = now.unix_timestamp() - claims.iat;
    if age < 0 {
        return Err(ResetTokenError::Malformed);
    }
    if age > ttl.whole_seconds() {
        return Err(ResetTokenError::Expired);
    }

    debug!(user_id = %claims.sub, "reset token verified");
    Ok(claims.sub)
}
