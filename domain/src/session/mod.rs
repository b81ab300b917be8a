//! This module provides functionality for issuing and validating the session
//! tokens this backend hands to its web client after a successful provider
//! login.
//!
//! Sessions are stateless: the token is a signed, self-contained JWT carrying
//! the user's stable provider id and display name. The server keeps no
//! session table and offers no revocation; logout is client-side token
//! deletion.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;

use crate::error::{AuthErrorKind, DomainErrorKind, Error, InternalErrorKind};

pub(crate) mod claims;

pub use claims::SessionClaims;

/// Fixed issuer embedded in (and required of) every session token.
pub const ISSUER: &str = "report-assistant";

/// Session lifetime from issuance.
const SESSION_TTL_HOURS: i64 = 24;

/// A session credential handed to the client after a successful exchange.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    /// Unix seconds at which the token stops validating.
    pub expires_at: i64,
}

/// The authenticated caller, as recovered from a validated session token.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub open_id: String,
    pub name: String,
}

/// Issue a session token for the given subject.
///
/// The subject id must be the provider `open_id`, the same identifier
/// report queries are scoped by.
pub fn issue(secret: &str, open_id: &str, name: &str) -> Result<Session, Error> {
    issue_at(secret, open_id, name, Utc::now())
}

fn issue_at(
    secret: &str,
    open_id: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Session, Error> {
    if secret.is_empty() {
        warn!("Refusing to sign a session token with an empty secret");
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        });
    }

    let expires_at = now + Duration::hours(SESSION_TTL_HOURS);
    let claims = SessionClaims {
        open_id: open_id.to_string(),
        name: name.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        iss: ISSUER.to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(Session {
        token,
        expires_at: expires_at.timestamp(),
    })
}

/// Validate a session token and recover the caller it was issued to.
///
/// Any failure (bad signature, expiry, wrong issuer, garbage input) is
/// reported as `Unauthenticated`; the distinction is logged, not exposed.
pub fn validate(secret: &str, token: &str) -> Result<SessionUser, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Session token rejected: {e:?}");
        Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Auth(AuthErrorKind::Unauthenticated),
        }
    })?;

    Ok(SessionUser {
        open_id: token_data.claims.open_id,
        name: token_data.claims.name,
    })
}

/// Validate a raw `Authorization` header value.
///
/// Fails closed for anything but the exact two-token form `Bearer <token>`.
pub fn validate_bearer_header(secret: &str, header_value: &str) -> Result<SessionUser, Error> {
    let mut parts = header_value.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("Bearer"), Some(token)) if !token.is_empty() => validate(secret, token),
        _ => Err(Error {
            source: None,
            error_kind: DomainErrorKind::Auth(AuthErrorKind::Unauthenticated),
        }),
    }
}
