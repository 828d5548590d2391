//! OpenID Connect UserInfo endpoint.
//!
//! `GET /oauth/userinfo` with a Bearer access token. Claims are filtered
//! by the token's granted scopes: `profile` releases name fields, `email`
//! releases the email fields. Tokens without a resource owner (client
//! credentials tokens) cannot use the endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::storage::SubjectStore;
use crate::token::service::{TokenService, require_scopes};
use crate::types::ScopeSet;

/// State for the userinfo endpoint.
#[derive(Clone)]
pub struct UserInfoState {
    /// Token service verifying access tokens.
    pub token_service: Arc<TokenService>,
    /// Subject store supplying claims.
    pub subjects: Arc<dyn SubjectStore>,
}

impl UserInfoState {
    /// Creates a new userinfo state.
    #[must_use]
    pub fn new(token_service: Arc<TokenService>, subjects: Arc<dyn SubjectStore>) -> Self {
        Self {
            token_service,
            subjects,
        }
    }
}

/// UserInfo response per OpenID Connect Core 1.0 Section 5.3.2.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserInfoResponse {
    /// Subject identifier. Always present.
    pub sub: String,

    /// Display name (`profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Preferred username (`profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Email address (`email` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the email address has been verified (`email` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// `GET /oauth/userinfo` handler.
///
/// - 200 with scope-filtered claims
/// - 401: token missing, invalid, expired, or revoked
/// - 403: token has no resource owner (client credentials token)
pub async fn userinfo_handler(
    State(state): State<UserInfoState>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return unauthorized("Missing bearer token");
    };

    let claims = match state.token_service.verify_access_token(token).await {
        Ok(Some(claims)) => claims,
        Ok(None) => return unauthorized("Invalid or expired token"),
        Err(e) => {
            tracing::error!(error = %e, "Token verification failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "server_error"})),
            )
                .into_response();
        }
    };

    // Client-credentials tokens carry the client id as their subject and
    // have no resource owner to describe.
    if claims.sub.is_empty() || claims.sub == claims.client_id {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": "invalid_token",
                "error_description": "Token has no resource owner",
            })),
        )
            .into_response();
    }

    // The userinfo endpoint requires the openid scope (OIDC Core 5.3)
    if require_scopes(&claims, &ScopeSet::parse("openid")).is_err() {
        return (
            StatusCode::FORBIDDEN,
            [(
                header::WWW_AUTHENTICATE,
                r#"Bearer error="insufficient_scope""#,
            )],
            Json(serde_json::json!({
                "error": "insufficient_scope",
                "error_description": "The openid scope is required for the userinfo endpoint",
            })),
        )
            .into_response();
    }

    let scope = ScopeSet::parse(&claims.scope);
    let mut response = UserInfoResponse {
        sub: claims.sub.clone(),
        ..Default::default()
    };

    match state.subjects.find_by_id(&claims.sub).await {
        Ok(Some(subject)) => {
            if scope.contains("profile") {
                response.name = subject.name;
                response.preferred_username = subject.username;
            }
            if scope.contains("email") {
                response.email = subject.email;
                response.email_verified = subject.email_verified;
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Subject lookup failed; serving bare sub claim");
        }
    }

    (StatusCode::OK, Json(response)).into_response()
}

/// Extracts the Bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 401 with the `WWW-Authenticate` challenge per RFC 6750.
fn unauthorized(description: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, r#"Bearer error="invalid_token""#)],
        Json(serde_json::json!({
            "error": "invalid_token",
            "error_description": description,
        })),
    )
        .into_response()
}
