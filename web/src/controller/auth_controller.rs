//! Controller for the provider login flows.
//!
//! Thin layer over `domain::login`: resolves the path's provider tag to an
//! injected provider instance and maps the flow's results onto the wire
//! shapes the frontend expects.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use serde::Serialize;
use serde_json::json;

use domain::error::{AuthErrorKind, DomainErrorKind, Error as DomainError, InternalErrorKind};
use domain::{login, Identity, Provider, ProviderKind};

use crate::error::Error;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::auth::ExchangeParams;
use crate::AppState;

/// Payload returned to the client to start a login round-trip.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub auth_url: String,
    pub state: String,
    pub provider: ProviderKind,
}

/// Payload returned after a successful code exchange.
#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: Identity,
    pub provider: ProviderKind,
}

/// Resolve a path's provider tag to the injected provider instance.
///
/// An unknown tag is a client error; a known tag with no configured provider
/// is a deployment problem.
fn resolve_provider<'a>(
    app_state: &'a AppState,
    provider: &str,
) -> Result<&'a Arc<dyn Provider>, Error> {
    let kind = ProviderKind::parse(provider).ok_or_else(|| {
        warn!("Unknown auth provider requested: {provider}");
        Error::from(DomainError {
            source: None,
            error_kind: DomainErrorKind::Auth(AuthErrorKind::InvalidRequest),
        })
    })?;

    app_state.provider(kind).ok_or_else(|| {
        error!("Auth provider {} is not configured", kind.as_str());
        Error::from(DomainError {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })
    })
}

/// GET /api/auth/:provider/login
///
/// Returns the provider consent URL and a fresh CSRF state for the frontend
/// to drive the authorization redirect.
#[utoipa::path(
    get,
    path = "/api/auth/{provider}/login",
    params(
        ("provider" = String, Path, description = "Provider tag: feishu or dingtalk"),
    ),
    responses(
        (status = 200, description = "Authorization URL and CSRF state"),
        (status = 400, description = "Unknown provider"),
        (status = 500, description = "Provider not configured"),
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let provider = resolve_provider(&app_state, &provider)?;
    let request = login::begin_login(provider.as_ref(), &app_state.states);

    Ok(Json(LoginResponse {
        auth_url: request.url,
        state: request.state,
        provider: provider.provider(),
    }))
}

/// POST /api/auth/:provider/exchange
///
/// Trades the authorization code returned by the provider callback for a
/// session token. Codes are single-use: any failure here means the frontend
/// must restart the login flow.
#[utoipa::path(
    post,
    path = "/api/auth/{provider}/exchange",
    params(
        ("provider" = String, Path, description = "Provider tag: feishu or dingtalk"),
    ),
    request_body = ExchangeParams,
    responses(
        (status = 200, description = "Session token, expiry, and normalized user identity"),
        (status = 400, description = "Missing code or state"),
        (status = 401, description = "State rejected or provider exchange failed"),
        (status = 500, description = "Token signing failed"),
    )
)]
pub async fn exchange(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    Json(params): Json<ExchangeParams>,
) -> Result<impl IntoResponse, Error> {
    let provider = resolve_provider(&app_state, &provider)?;

    let (session, identity) = login::complete_login(
        &app_state.config,
        provider.as_ref(),
        &app_state.states,
        &params.code,
        &params.state,
    )
    .await?;

    Ok(Json(ExchangeResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: identity,
        provider: provider.provider(),
    }))
}

/// POST /api/auth/logout
///
/// Sessions are stateless JWTs, so logging out is client-side token deletion;
/// this endpoint only acknowledges the request.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Acknowledged"),
    )
)]
pub async fn logout() -> impl IntoResponse {
    Json(json!({
        "message": "Logged out successfully",
    }))
}

/// GET /api/auth/user
///
/// Returns the identity carried by the presented session token.
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "The authenticated user's id and display name"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn current_user(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(json!({
        "open_id": user.open_id,
        "name": user.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::define_routes;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use domain::AuthorizationRequest;
    use messenger_auth::error::{oauth_error, OAuthErrorKind};
    use messenger_auth::Error as MessengerAuthError;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::Value;
    use service::config::Config;
    use tower::ServiceExt;

    const SECRET: &str = "controller-test-secret";

    /// Provider double mirroring a mocked upstream: code "code-1" resolves to
    /// token "tok-1", which resolves to user u1/Alice.
    struct FakeProvider {
        fail_exchange: bool,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn provider(&self) -> ProviderKind {
            ProviderKind::Feishu
        }

        fn authorization_url(&self, state: &str) -> AuthorizationRequest {
            AuthorizationRequest {
                url: format!("https://consent.test/authorize?state={state}"),
                state: state.to_string(),
            }
        }

        async fn exchange_code(&self, code: &str) -> Result<SecretString, MessengerAuthError> {
            if self.fail_exchange || code != "code-1" {
                return Err(oauth_error(
                    OAuthErrorKind::TokenExchangeFailed,
                    "token endpoint returned 500",
                ));
            }
            Ok(SecretString::from("tok-1".to_string()))
        }

        async fn fetch_identity(
            &self,
            access_token: &SecretString,
        ) -> Result<Identity, MessengerAuthError> {
            assert_eq!(access_token.expose_secret(), "tok-1");
            Ok(Identity {
                open_id: "u1".to_string(),
                union_id: String::new(),
                user_id: "u1".to_string(),
                name: "Alice".to_string(),
                avatar_url: String::new(),
                email: String::new(),
                mobile: String::new(),
                provider: ProviderKind::Feishu,
            })
        }
    }

    fn test_app(fail_exchange: bool) -> axum::Router {
        let config = Config::default().set_jwt_secret(SECRET.to_string());
        let app_state = AppState::new(config, vec![Arc::new(FakeProvider { fail_exchange })]);
        define_routes(app_state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login_state(app: &axum::Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/feishu/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["provider"], "feishu");
        assert!(body["auth_url"]
            .as_str()
            .unwrap()
            .contains(body["state"].as_str().unwrap()));
        body["state"].as_str().unwrap().to_string()
    }

    fn exchange_request(state: &str, code: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/feishu/exchange")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"code": code, "state": state}).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_login_exchange_and_protected_access() {
        let app = test_app(false);

        let state = login_state(&app).await;

        let response = app
            .clone()
            .oneshot(exchange_request(&state, "code-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["user"]["open_id"], "u1");
        assert_eq!(body["user"]["name"], "Alice");
        assert_eq!(body["provider"], "feishu");
        assert!(body["expires_at"].as_i64().unwrap() > 0);

        // The issued session token must validate back to the same subject.
        let token = body["token"].as_str().unwrap();
        let user = domain::session::validate(SECRET, token).unwrap();
        assert_eq!(user.open_id, "u1");

        // ...and must grant access to the protected endpoint.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/user")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["open_id"], "u1");
        assert_eq!(body["name"], "Alice");
    }

    #[tokio::test]
    async fn test_exchange_upstream_failure_returns_401_without_token() {
        let app = test_app(true);
        let state = login_state(&app).await;

        let response = app
            .clone()
            .oneshot(exchange_request(&state, "code-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!bytes.is_empty());
        assert!(serde_json::from_slice::<Value>(&bytes)
            .map(|v| v.get("token").is_none())
            .unwrap_or(true));
    }

    #[tokio::test]
    async fn test_exchange_with_forged_state_returns_401() {
        let app = test_app(false);

        let response = app
            .clone()
            .oneshot(exchange_request("forged-state", "code-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_exchange_with_missing_code_returns_400() {
        let app = test_app(false);
        let state = login_state(&app).await;

        let response = app
            .clone()
            .oneshot(exchange_request(&state, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_provider_returns_400() {
        let app = test_app(false);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/slack/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_known_but_unconfigured_provider_returns_500() {
        let app = test_app(false);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/dingtalk/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_protected_endpoint_without_header_returns_401() {
        let app = test_app(false);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/user")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_is_a_stateless_acknowledgement() {
        let app = test_app(false);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Logged out successfully");
    }
}
