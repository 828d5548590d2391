//! Authorization endpoint types.
//!
//! Request, success, and error shapes for the OAuth 2.0 authorization
//! endpoint, plus redirect-URL construction. Whether an error may be
//! delivered by redirect is decided in the HTTP layer: only requests whose
//! client and redirect URI validated are ever redirected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated authorization request as seen by the service layer.
///
/// The `subject` is the already-authenticated resource owner; establishing
/// that identity (login, SSO, sessions) happens upstream of this engine.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    /// Requested response type; only "code" is supported.
    pub response_type: String,

    /// Client identifier issued at registration.
    pub client_id: String,

    /// Redirect URI; must exactly match a registered URI.
    pub redirect_uri: String,

    /// Requested scopes (space-separated wire form).
    pub scope: String,

    /// Client CSRF state, echoed back on the redirect.
    pub state: Option<String>,

    /// PKCE code challenge.
    pub code_challenge: Option<String>,

    /// PKCE challenge method ("plain" or "S256").
    pub code_challenge_method: Option<String>,

    /// OpenID Connect nonce for ID token binding.
    pub nonce: Option<String>,

    /// Authenticated resource owner identifier.
    pub subject: String,
}

/// Authorization success response: the parameters appended to the redirect.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeResponse {
    /// Single-use authorization code.
    pub code: String,

    /// Echoed state parameter, when the client sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizeResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: Option<String>) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL carrying `code` and `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI does not parse.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error response delivered on the redirect.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeError {
    /// OAuth 2.0 error code.
    pub error: AuthorizeErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter, when the client sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizeError {
    /// Creates a new authorization error with description.
    #[must_use]
    pub fn with_description(
        error: AuthorizeErrorCode,
        description: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
        }
    }

    /// Builds the redirect URL carrying `error`, `error_description`, `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI does not parse.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes per RFC 6749 Section 4.1.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizeErrorCode {
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,

    /// The client is not authorized to request a code using this method.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The server does not support obtaining a code using this method.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The server encountered an unexpected condition.
    ServerError,
}

impl AuthorizeErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthorizeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
