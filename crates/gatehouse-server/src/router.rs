//! HTTP router wiring.
//!
//! Each endpoint group carries its own state; the groups merge into one
//! router with request tracing layered on top.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use gatehouse_auth::config::AuthConfig;
use gatehouse_auth::http::{
    AuthorizeState, DiscoveryState, IntrospectionState, JwksState, RevocationState, TokenState,
    UserInfoState, authorize_get, authorize_post, introspect_handler, jwks_handler,
    openid_configuration_handler, revoke_handler, token_handler, userinfo_handler,
};
use gatehouse_auth::oauth::AuthorizationService;
use gatehouse_auth::storage::{ClientStore, SubjectStore};
use gatehouse_auth::token::{JwtService, TokenService};

/// Builds the full endpoint router.
pub fn build_router(
    authorization_service: Arc<AuthorizationService>,
    token_service: Arc<TokenService>,
    clients: Arc<dyn ClientStore>,
    subjects: Arc<dyn SubjectStore>,
    jwt: Arc<JwtService>,
    auth_config: AuthConfig,
) -> Router {
    let authorize = Router::new()
        .route("/oauth/authorize", get(authorize_get).post(authorize_post))
        .with_state(AuthorizeState::new(authorization_service));

    let token = Router::new()
        .route("/oauth/token", post(token_handler))
        .with_state(TokenState::new(token_service.clone(), clients.clone()));

    let revoke = Router::new()
        .route("/oauth/revoke", post(revoke_handler))
        .with_state(RevocationState::new(token_service.clone(), clients.clone()));

    let introspect = Router::new()
        .route("/oauth/introspect", post(introspect_handler))
        .with_state(IntrospectionState::new(token_service.clone(), clients));

    let userinfo = Router::new()
        .route("/oauth/userinfo", get(userinfo_handler))
        .with_state(UserInfoState::new(token_service, subjects));

    let discovery = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(openid_configuration_handler),
        )
        .with_state(DiscoveryState::new(auth_config));

    let jwks = Router::new()
        .route("/.well-known/jwks.json", get(jwks_handler))
        .with_state(JwksState::new(jwt));

    authorize
        .merge(token)
        .merge(revoke)
        .merge(introspect)
        .merge(userinfo)
        .merge(discovery)
        .merge(jwks)
        .layer(TraceLayer::new_for_http())
}
