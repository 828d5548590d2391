//! Token introspection endpoint handler (RFC 7662).
//!
//! `POST /oauth/introspect`. Requires client authentication; always
//! answers 200 with `{"active": ...}` for authenticated callers.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::oauth::client_auth::{authenticate_client, parse_basic_auth};
use crate::oauth::token::TokenRequest;
use crate::storage::ClientStore;
use crate::token::introspection::IntrospectionRequest;
use crate::token::revocation::TokenTypeHint;
use crate::token::service::TokenService;

/// State for the introspection endpoint.
#[derive(Clone)]
pub struct IntrospectionState {
    /// Token service performing introspection.
    pub token_service: Arc<TokenService>,
    /// Client store for authentication.
    pub clients: Arc<dyn ClientStore>,
}

impl IntrospectionState {
    /// Creates a new introspection state.
    #[must_use]
    pub fn new(token_service: Arc<TokenService>, clients: Arc<dyn ClientStore>) -> Self {
        Self {
            token_service,
            clients,
        }
    }
}

/// Form parameters for the introspection endpoint.
#[derive(Debug, Deserialize)]
pub struct IntrospectionForm {
    /// The token to introspect.
    pub token: String,

    /// Optional hint about the token type.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client ID (public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// `POST /oauth/introspect` handler.
///
/// - 200 `{"active": true/false, ...}` for authenticated callers
/// - 400: missing `token` parameter
/// - 401: client authentication failed
pub async fn introspect_handler(
    State(state): State<IntrospectionState>,
    headers: HeaderMap,
    Form(form): Form<IntrospectionForm>,
) -> Response {
    if form.token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_request",
                "error_description": "Missing required 'token' parameter",
            })),
        )
            .into_response();
    }

    let basic_auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth);
    let basic_auth_ref = basic_auth
        .as_ref()
        .map(|(id, secret)| (id.as_str(), secret.as_str()));

    let auth_request =
        TokenRequest::for_client_auth(form.client_id.clone(), form.client_secret.clone());
    match authenticate_client(&auth_request, basic_auth_ref, state.clients.as_ref()).await {
        Ok(_authenticated) => {
            let request = IntrospectionRequest {
                token: form.token,
                token_type_hint: form
                    .token_type_hint
                    .as_deref()
                    .and_then(TokenTypeHint::parse),
            };
            let response = state.token_service.introspect(&request).await;
            tracing::debug!(active = response.active, "Token introspection completed");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Introspection: client authentication failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "invalid_client",
                    "error_description": e.public_description(),
                })),
            )
                .into_response()
        }
    }
}
