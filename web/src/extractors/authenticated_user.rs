use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::session::SessionUser;

pub(crate) struct AuthenticatedUser(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    // This extractor reads the SessionUser that the require_auth middleware
    // attached to the request extensions. A missing user means the route was
    // not wrapped by the middleware, or validation failed; either way the
    // request is rejected as Unauthorized.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<SessionUser>() {
            Some(user) => Ok(AuthenticatedUser(user.clone())),
            None => Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string())),
        }
    }
}
