//! Token endpoint handler.
//!
//! `POST /oauth/token` with an `application/x-www-form-urlencoded` body.
//! Clients authenticate with HTTP Basic Auth, body credentials, or a bare
//! `client_id` (public clients); the grant itself is dispatched by the
//! token service.
//!
//! # Example
//!
//! ```text
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=https://app.example.com/callback
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=web-app
//! ```

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::oauth::client_auth::{authenticate_client, parse_basic_auth};
use crate::oauth::token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
use crate::storage::ClientStore;
use crate::token::service::TokenService;
use crate::types::Client;

/// State for the token endpoint.
#[derive(Clone)]
pub struct TokenState {
    /// Token service dispatching grants.
    pub token_service: Arc<TokenService>,
    /// Client store for authentication.
    pub clients: Arc<dyn ClientStore>,
}

impl TokenState {
    /// Creates a new token state.
    #[must_use]
    pub fn new(token_service: Arc<TokenService>, clients: Arc<dyn ClientStore>) -> Self {
        Self {
            token_service,
            clients,
        }
    }
}

/// `POST /oauth/token` handler.
pub async fn token_handler(
    State(state): State<TokenState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    debug!(
        grant_type = %request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    let client = match resolve_client(&state, &headers, &request).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Client authentication failed");
            return error_response(&e);
        }
    };

    let result = state
        .token_service
        .exchange(&request, client.as_ref())
        .await;

    match result {
        Ok(response) => {
            info!(
                client_id = ?client.as_ref().map(|c| c.client_id.as_str()),
                grant_type = %request.grant_type,
                "Token issued"
            );
            success_response(response)
        }
        Err(e) => {
            if e.is_server_error() {
                tracing::error!(grant_type = %request.grant_type, error = %e, "Token request failed");
            } else {
                warn!(grant_type = %request.grant_type, error = %e, "Token request rejected");
            }
            error_response(&e)
        }
    }
}

/// Authenticates the calling client when it identified itself.
///
/// The refresh_token grant may run without any client identification
/// (public clients hold no credentials and RFC 6749 does not force the
/// parameter); every other grant requires authentication, enforced by the
/// token service dispatcher.
async fn resolve_client(
    state: &TokenState,
    headers: &HeaderMap,
    request: &TokenRequest,
) -> Result<Option<Client>, AuthError> {
    let basic_auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth);

    let has_credentials = basic_auth.is_some() || request.client_id.is_some();
    if !has_credentials && request.grant_type == "refresh_token" {
        return Ok(None);
    }

    let basic_auth_ref = basic_auth
        .as_ref()
        .map(|(id, secret)| (id.as_str(), secret.as_str()));

    let authenticated = authenticate_client(request, basic_auth_ref, state.clients.as_ref()).await?;
    Ok(Some(authenticated.client))
}

/// 200 with the token payload. Token responses are never cacheable.
fn success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [("Cache-Control", "no-store"), ("Pragma", "no-cache")],
        Json(response),
    )
        .into_response()
}

/// Maps an engine error to the RFC 6749 error envelope.
fn error_response(error: &AuthError) -> Response {
    let code = match error {
        AuthError::InvalidRequest { .. } => TokenErrorCode::InvalidRequest,
        AuthError::InvalidClient { .. } => TokenErrorCode::InvalidClient,
        AuthError::InvalidGrant { .. } | AuthError::PkceVerificationFailed => {
            TokenErrorCode::InvalidGrant
        }
        AuthError::InvalidScope { .. } => TokenErrorCode::InvalidScope,
        AuthError::UnauthorizedClient { .. } => TokenErrorCode::UnauthorizedClient,
        AuthError::UnsupportedGrantType { .. } => TokenErrorCode::UnsupportedGrantType,
        _ => TokenErrorCode::ServerError,
    };

    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    let body = TokenError::with_description(code, error.public_description());

    (
        status,
        [("Cache-Control", "no-store"), ("Pragma", "no-cache")],
        Json(body),
    )
        .into_response()
}
