use crate::{
    controller::health_check_controller, middleware::auth::require_auth, params, AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::controller::auth_controller;

use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Report Assistant API"
        ),
        paths(
            auth_controller::login,
            auth_controller::exchange,
            auth_controller::logout,
            auth_controller::current_user,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                params::auth::ExchangeParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "report_assistant", description = "Report Assistant login and session API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our bearer session token authentication requirement for gaining
// access to our protected API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes(app_state.clone()))
        .merge(session_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Routes for the login round-trip (no session required).
fn auth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/auth/:provider/login", get(auth_controller::login))
        .route(
            "/api/auth/:provider/exchange",
            post(auth_controller::exchange),
        )
        .route("/api/auth/logout", post(auth_controller::logout))
        .with_state(app_state)
}

/// Routes that require a valid session token.
fn session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/auth/user", get(auth_controller::current_user))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}
