//! Claims carried by the session tokens this backend issues.

use serde::{Deserialize, Serialize};

/// Registered + private claims for a session token.
///
/// `open_id` is the provider-stable user id the session is scoped to. It is
/// the same identifier downstream report calls key off, so it must never be
/// substituted with a display name.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub open_id: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}
