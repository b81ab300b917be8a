use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use domain::session;

use crate::AppState;

/// Authentication middleware that returns 401 Unauthorized for requests
/// without a valid `Authorization: Bearer <token>` header.
///
/// On success the validated `SessionUser` is attached to the request
/// extensions, so handlers observe the caller's identity through
/// request-scoped context rather than any global state.
pub async fn require_auth(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match header_value {
        Some(header_value) => {
            match session::validate_bearer_header(app_state.config.jwt_secret(), header_value) {
                Ok(user) => {
                    request.extensions_mut().insert(user);
                    next.run(request).await
                }
                Err(_) => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            }
        }
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}

/// Optional authentication middleware (does not require a session).
///
/// Attaches the caller's identity when a valid session token is presented but
/// never fails the request, for endpoints that behave differently for
/// anonymous and authenticated callers.
pub async fn optional_auth(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(header_value) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Ok(user) =
            session::validate_bearer_header(app_state.config.jwt_secret(), header_value)
        {
            request.extensions_mut().insert(user);
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::Request,
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use domain::session::SessionUser;
    use service::config::Config;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret";

    async fn whoami(user: Option<Extension<SessionUser>>) -> String {
        match user {
            Some(Extension(user)) => user.open_id,
            None => "anonymous".to_string(),
        }
    }

    fn test_state() -> AppState {
        let config = Config::default().set_jwt_secret(SECRET.to_string());
        AppState::new(config, vec![])
    }

    fn protected_app(app_state: AppState) -> Router {
        Router::new()
            .route("/test", get(whoami))
            .route_layer(from_fn_with_state(app_state.clone(), require_auth))
            .with_state(app_state)
    }

    #[tokio::test]
    async fn test_require_auth_returns_401_with_no_header() {
        let app = protected_app(test_state());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_returns_401_with_wrong_scheme() {
        let app = protected_app(test_state());

        let request = Request::builder()
            .uri("/test")
            .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_attaches_session_user() {
        let app = protected_app(test_state());
        let session = session::issue(SECRET, "u1", "Alice").unwrap();

        let request = Request::builder()
            .uri("/test")
            .header(AUTHORIZATION, format!("Bearer {}", session.token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"u1");
    }

    #[tokio::test]
    async fn test_optional_auth_passes_anonymous_through() {
        let app_state = test_state();
        let app = Router::new()
            .route("/test", get(whoami))
            .route_layer(from_fn_with_state(app_state.clone(), optional_auth))
            .with_state(app_state);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"anonymous");
    }

    #[tokio::test]
    async fn test_optional_auth_attaches_identity_when_valid() {
        let app_state = test_state();
        let app = Router::new()
            .route("/test", get(whoami))
            .route_layer(from_fn_with_state(app_state.clone(), optional_auth))
            .with_state(app_state);

        let session = session::issue(SECRET, "u2", "Bob").unwrap();
        let request = Request::builder()
            .uri("/test")
            .header(AUTHORIZATION, format!("Bearer {}", session.token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"u2");
    }
}
