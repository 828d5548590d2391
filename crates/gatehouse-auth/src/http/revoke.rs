//! Token revocation endpoint handler (RFC 7009).
//!
//! `POST /oauth/revoke`. Once the client authenticates, the endpoint
//! always acknowledges with 200 `{"success":true}` — revoking an unknown
//! or already-revoked token is indistinguishable from revoking a live one.

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
use crate::token::revocation::{RevocationRequest, RevocationResponse, TokenTypeHint};
use crate::token::service::TokenService;

/// State for the revocation endpoint.
#[derive(Clone)]
pub struct RevocationState {
    /// Token service performing revocation.
    pub token_service: Arc<TokenService>,
    /// Client store for authentication.
    pub clients: Arc<dyn ClientStore>,
}

impl RevocationState {
    /// Creates a new revocation state.
    #[must_use]
    pub fn new(token_service: Arc<TokenService>, clients: Arc<dyn ClientStore>) -> Self {
        Self {
            token_service,
            clients,
        }
    }
}

/// Form parameters for the revocation endpoint.
#[derive(Debug, Deserialize)]
pub struct RevocationForm {
    /// The token to revoke.
    pub token: String,

    /// Optional hint about the token type. Unknown hints are ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client ID (public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// `POST /oauth/revoke` handler.
///
/// - 200 `{"success":true}`: token revoked, or was already invalid
/// - 400: missing `token` parameter
/// - 401: client authentication failed
pub async fn revoke_handler(
    State(state): State<RevocationState>,
    headers: HeaderMap,
    Form(form): Form<RevocationForm>,
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

    let auth_request = TokenRequest::for_client_auth(form.client_id.clone(), form.client_secret.clone());
    let client = match authenticate_client(&auth_request, basic_auth_ref, state.clients.as_ref())
        .await
    {
        Ok(authenticated) => authenticated.client,
        Err(e) => {
            tracing::debug!(error = %e, "Revocation: client authentication failed");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "invalid_client",
                    "error_description": e.public_description(),
                })),
            )
                .into_response();
        }
    };

    let request = RevocationRequest {
        token: form.token,
        token_type_hint: form.token_type_hint.as_deref().and_then(TokenTypeHint::parse),
    };

    match state.token_service.revoke(&request).await {
        Ok(()) => {
            tracing::info!(client_id = %client.client_id, "Token revocation processed");
        }
        Err(e) => {
            // Still 200: the response must not reveal token state, and a
            // transient store failure is not the caller's signal to probe.
            tracing::warn!(client_id = %client.client_id, error = %e, "Revocation store error");
        }
    }

    (StatusCode::OK, Json(RevocationResponse::ok())).into_response()
}
