//! Authorization server error types.
//!
//! Protocol failures are values, not panics: every core operation returns
//! either its success payload or one of the OAuth 2.0 taxonomy codes below,
//! carried through `AuthResult<T>`.

use std::fmt;

/// Errors that can occur while processing authorization and token requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Client authentication failed or the client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired, or revoked.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The requested scope is invalid, unknown, or exceeds what the client may request.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The client is not authorized to use the requested grant or response type.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        message: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The resource owner or authorization server denied the request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// PKCE code verifier does not match the stored code challenge.
    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    /// An error occurred while storing or retrieving auth data.
    /// Never surfaced verbatim to clients; maps to `server_error`.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client-correctable error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Internal { .. })
    }

    /// Returns the OAuth 2.0 error code for this error.
    ///
    /// Storage and internal failures collapse into the opaque `server_error`
    /// code; their descriptions are never sent to the client.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::AccessDenied { .. } => "access_denied",
            Self::PkceVerificationFailed => "invalid_grant",
            Self::Storage { .. } | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the description safe to expose to the caller.
    ///
    /// Server-side failures are replaced with a generic message so that no
    /// storage or internal detail leaks over the wire.
    #[must_use]
    pub fn public_description(&self) -> String {
        if self.is_server_error() {
            "The authorization server encountered an internal error".to_string()
        } else {
            self.to_string()
        }
    }

    /// Returns the HTTP status code the transport layer should use.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient { .. } => 401,
            Self::Storage { .. } | Self::Internal { .. } => 500,
            _ => 400,
        }
    }
}

/// Categories of auth errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Client/grant authentication errors.
    Authentication,
    /// Scope and permission errors.
    Authorization,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl AuthError {
    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. }
            | Self::UnsupportedGrantType { .. }
            | Self::UnsupportedResponseType { .. } => ErrorCategory::Validation,
            Self::InvalidClient { .. } | Self::InvalidGrant { .. } | Self::PkceVerificationFailed => {
                ErrorCategory::Authentication
            }
            Self::InvalidScope { .. }
            | Self::UnauthorizedClient { .. }
            | Self::AccessDenied { .. } => ErrorCategory::Authorization,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::invalid_grant("authorization code expired");
        assert_eq!(
            err.to_string(),
            "Invalid grant: authorization code expired"
        );

        let err = AuthError::PkceVerificationFailed;
        assert_eq!(err.to_string(), "PKCE verification failed");
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_request("x").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::invalid_grant("x").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::unauthorized_client("x").oauth_error_code(),
            "unauthorized_client"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("implicit").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            AuthError::PkceVerificationFailed.oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(AuthError::storage("x").oauth_error_code(), "server_error");
        assert_eq!(AuthError::internal("x").oauth_error_code(), "server_error");
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AuthError::storage("connection refused to db host 10.0.0.3");
        assert!(err.is_server_error());
        assert!(!err.public_description().contains("10.0.0.3"));

        let err = AuthError::invalid_grant("authorization code expired");
        assert!(err.public_description().contains("expired"));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::invalid_client("x").http_status(), 401);
        assert_eq!(AuthError::invalid_grant("x").http_status(), 400);
        assert_eq!(AuthError::invalid_request("x").http_status(), 400);
        assert_eq!(AuthError::storage("x").http_status(), 500);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_request("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::invalid_client("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::invalid_scope("x").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
    }
}
