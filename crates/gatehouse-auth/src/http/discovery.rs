//! OpenID Connect discovery handler.
//!
//! Serves `GET /.well-known/openid-configuration` from the server
//! configuration. Endpoint URLs derive from the configured issuer, not
//! the bind address.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::config::AuthConfig;

/// State for the discovery endpoint.
#[derive(Clone)]
pub struct DiscoveryState {
    /// Authorization server configuration.
    pub config: AuthConfig,
}

impl DiscoveryState {
    /// Creates a new discovery state.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

/// Handler for `GET /.well-known/openid-configuration`.
pub async fn openid_configuration_handler(
    State(state): State<DiscoveryState>,
) -> impl IntoResponse {
    let base = state.config.issuer.trim_end_matches('/');

    let doc = serde_json::json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/oauth/authorize"),
        "token_endpoint": format!("{base}/oauth/token"),
        "userinfo_endpoint": format!("{base}/oauth/userinfo"),
        "revocation_endpoint": format!("{base}/oauth/revoke"),
        "introspection_endpoint": format!("{base}/oauth/introspect"),
        "jwks_uri": format!("{base}/.well-known/jwks.json"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token", "client_credentials"],
        "code_challenge_methods_supported": ["plain", "S256"],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post", "none"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["RS256"],
        "scopes_supported": ["openid", "profile", "email", "offline_access"],
    });

    ([(header::CONTENT_TYPE, "application/json")], Json(doc))
}
