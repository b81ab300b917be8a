//! Error types for the `domain` layer.
use messenger_auth::error::{
    Error as MessengerAuthError, ErrorKind as MessengerAuthErrorKind, OAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries: `domain` depends on `messenger-auth`, and `web` depends on `domain`,
/// but `web` should not depend, directly, on `messenger-auth`. Ultimately the various
/// `error_kind`s are used by `web` to return appropriate HTTP status codes and messages
/// to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Auth(AuthErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of authentication errors. These map the
/// login-flow failure taxonomy onto HTTP statuses at the `web` layer.
#[derive(Debug, PartialEq)]
pub enum AuthErrorKind {
    /// Missing, malformed, expired, or improperly signed session credential.
    Unauthenticated,
    /// A hop of the provider code-for-identity exchange failed. Codes are
    /// single-use, so the client must restart the login flow.
    ExchangeFailed,
    /// The callback state was missing from the store, already used, or expired.
    InvalidState,
    /// Malformed login input (missing code or state).
    InvalidRequest,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `messenger-auth` layer to the `domain` layer.
impl From<MessengerAuthError> for Error {
    fn from(err: MessengerAuthError) -> Self {
        let error_kind = match &err.error_kind {
            MessengerAuthErrorKind::OAuth(kind) => match kind {
                OAuthErrorKind::TokenExchangeFailed
                | OAuthErrorKind::IdentityFetchFailed
                | OAuthErrorKind::UserIdResolutionFailed
                | OAuthErrorKind::InvalidResponse => {
                    DomainErrorKind::Auth(AuthErrorKind::ExchangeFailed)
                }
                OAuthErrorKind::InvalidState => DomainErrorKind::Auth(AuthErrorKind::InvalidState),
                OAuthErrorKind::Network => DomainErrorKind::External(ExternalErrorKind::Network),
            },
            MessengerAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JWT encoding related error".to_string(),
            )),
        }
    }
}
