//! Authorization endpoint handlers.
//!
//! `GET /oauth/authorize` and `POST /oauth/authorize` (form submission)
//! share one implementation.
//!
//! # Error delivery
//!
//! Failures are delivered as `error`/`error_description`/`state` query
//! parameters on a 302 to the client's redirect URI — except when the
//! client or the redirect URI itself could not be validated. Those render
//! directly to the caller: redirecting to an unverified URI would be an
//! open-redirect primitive.
//!
//! # Subject authentication
//!
//! Authenticating the resource owner is outside this engine. The fronting
//! identity layer asserts the authenticated subject in the
//! `x-authenticated-subject` header; requests without it are refused.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;

use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizeError, AuthorizeErrorCode, AuthorizeRequest, AuthorizeResponse,
};
use crate::oauth::service::AuthorizationService;

/// Header carrying the authenticated resource owner identifier.
pub const SUBJECT_HEADER: &str = "x-authenticated-subject";

/// State for the authorize handlers.
#[derive(Clone)]
pub struct AuthorizeState {
    /// Authorization service minting codes.
    pub authorization_service: Arc<AuthorizationService>,
}

impl AuthorizeState {
    /// Creates a new authorize state.
    #[must_use]
    pub fn new(authorization_service: Arc<AuthorizationService>) -> Self {
        Self {
            authorization_service,
        }
    }
}

/// Query/form parameters of an authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeParams {
    /// Requested response type; only "code" is supported.
    pub response_type: String,

    /// Client identifier.
    pub client_id: String,

    /// Redirect URI; must exactly match a registered URI.
    pub redirect_uri: String,

    /// Requested scopes (space-separated).
    #[serde(default)]
    pub scope: String,

    /// Client CSRF state, echoed back on the redirect.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE challenge method.
    #[serde(default)]
    pub code_challenge_method: Option<String>,

    /// OpenID Connect nonce.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// `GET /oauth/authorize` handler.
pub async fn authorize_get(
    State(state): State<AuthorizeState>,
    headers: HeaderMap,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    handle_authorize(&state, &headers, params).await
}

/// `POST /oauth/authorize` handler (form-encoded body, consent-form path).
pub async fn authorize_post(
    State(state): State<AuthorizeState>,
    headers: HeaderMap,
    Form(params): Form<AuthorizeParams>,
) -> Response {
    handle_authorize(&state, &headers, params).await
}

async fn handle_authorize(
    state: &AuthorizeState,
    headers: &HeaderMap,
    params: AuthorizeParams,
) -> Response {
    // Client and redirect URI must validate before any redirect is allowed.
    let client = match state
        .authorization_service
        .clients()
        .find_by_client_id(&params.client_id)
        .await
    {
        Ok(Some(client)) => client,
        Ok(None) => {
            return direct_error(
                StatusCode::BAD_REQUEST,
                "invalid_client",
                "Unknown client",
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Client lookup failed");
            return direct_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Failed to validate client",
            );
        }
    };

    if !client.active {
        return direct_error(StatusCode::BAD_REQUEST, "invalid_client", "Client is inactive");
    }

    if !client.is_redirect_uri_allowed(&params.redirect_uri) {
        return direct_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "redirect_uri is not registered for this client",
        );
    }

    // The subject must already be authenticated by the identity layer.
    let subject = headers
        .get(SUBJECT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(subject) = subject else {
        return direct_error(
            StatusCode::UNAUTHORIZED,
            "access_denied",
            "Resource owner authentication required",
        );
    };

    let request = AuthorizeRequest {
        response_type: params.response_type,
        client_id: params.client_id,
        redirect_uri: params.redirect_uri.clone(),
        scope: params.scope,
        state: params.state.clone(),
        code_challenge: params.code_challenge,
        code_challenge_method: params.code_challenge_method,
        nonce: params.nonce,
        subject: subject.to_string(),
    };

    match state.authorization_service.authorize(&request).await {
        Ok(code) => {
            let response = AuthorizeResponse::new(code.code, code.state);
            match response.to_redirect_url(&params.redirect_uri) {
                Ok(url) => redirect(&url),
                Err(e) => {
                    tracing::error!(error = %e, "Registered redirect URI failed to parse");
                    direct_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "server_error",
                        "Invalid redirect URI",
                    )
                }
            }
        }
        Err(e) => redirect_error(&params.redirect_uri, params.state, &e),
    }
}

/// Maps a service error onto the redirect error envelope.
fn redirect_error(redirect_uri: &str, state: Option<String>, error: &AuthError) -> Response {
    let code = match error {
        AuthError::UnsupportedResponseType { .. } => AuthorizeErrorCode::UnsupportedResponseType,
        AuthError::UnauthorizedClient { .. } => AuthorizeErrorCode::UnauthorizedClient,
        AuthError::InvalidScope { .. } => AuthorizeErrorCode::InvalidScope,
        AuthError::AccessDenied { .. } => AuthorizeErrorCode::AccessDenied,
        AuthError::Storage { .. } | AuthError::Internal { .. } => AuthorizeErrorCode::ServerError,
        // The client was validated above; anything else is a request problem
        _ => AuthorizeErrorCode::InvalidRequest,
    };

    if error.is_server_error() {
        tracing::error!(error = %error, "Authorization request failed");
    } else {
        tracing::debug!(error = %error, "Authorization request rejected");
    }

    let envelope = AuthorizeError::with_description(code, error.public_description(), state);
    match envelope.to_redirect_url(redirect_uri) {
        Ok(url) => redirect(&url),
        Err(_) => direct_error(
            StatusCode::BAD_REQUEST,
            code.as_str(),
            &error.public_description(),
        ),
    }
}

/// 302 redirect per RFC 6749 Section 4.1.2.
fn redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// Error rendered directly to the caller; used whenever redirecting is not
/// safe or not possible.
fn direct_error(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "error_description": description,
        })),
    )
        .into_response()
}
