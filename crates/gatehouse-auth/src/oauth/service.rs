//! Authorization service.
//!
//! Validates authorization requests and mints single-use authorization
//! codes. One call performs one state transition: a validated request
//! becomes a persisted `AuthorizationCode` whose value goes back to the
//! client on the redirect.
//!
//! # Security
//!
//! - Redirect URIs match registered values exactly; no wildcard rules
//! - Codes carry 256 bits of entropy and expire after 10 minutes by default
//! - Code values and PKCE material are never logged

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::authorize::AuthorizeRequest;
use crate::oauth::pkce::{PkceChallenge, PkceMethod};
use crate::storage::{ClientStore, CodeStore};
use crate::types::code::AuthorizationCode;
use crate::types::{Client, GrantType, ScopeSet};

/// Configuration for the authorization service.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// Authorization code lifetime. Default: 10 minutes.
    pub code_lifetime: Duration,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::seconds(600),
        }
    }
}

impl AuthorizationConfig {
    /// Sets a custom code lifetime.
    #[must_use]
    pub fn with_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.code_lifetime = lifetime;
        self
    }
}

/// Service handling OAuth 2.0 authorization requests.
pub struct AuthorizationService {
    /// Client store for looking up registrations.
    clients: Arc<dyn ClientStore>,

    /// Code store for persisting authorization codes.
    codes: Arc<dyn CodeStore>,

    /// Service configuration.
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientStore>,
        codes: Arc<dyn CodeStore>,
        config: AuthorizationConfig,
    ) -> Self {
        Self {
            clients,
            codes,
            config,
        }
    }

    /// Processes an authorization request and mints an authorization code.
    ///
    /// # Errors
    ///
    /// - Unknown or inactive client (`InvalidClient`)
    /// - Redirect URI not registered (`InvalidRequest`)
    /// - Response type not "code" (`UnsupportedResponseType`)
    /// - Response or grant type not permitted for the client (`UnauthorizedClient`)
    /// - Requested scope outside the allowed set (`InvalidScope`)
    /// - PKCE required but absent, or malformed PKCE parameters (`InvalidRequest`)
    pub async fn authorize(&self, request: &AuthorizeRequest) -> AuthResult<AuthorizationCode> {
        // 1. Client must exist and be active
        let client = self
            .clients
            .find_by_client_id(&request.client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is inactive"));
        }

        // 2. Redirect URI must match a registered value exactly
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::invalid_request(
                "redirect_uri is not registered for this client",
            ));
        }

        // 3. Response type: server supports "code"; client must permit it
        if request.response_type != "code" {
            return Err(AuthError::unsupported_response_type(&request.response_type));
        }
        if !client.is_response_type_allowed(&request.response_type) {
            return Err(AuthError::unauthorized_client(
                "Client is not registered for response_type=code",
            ));
        }
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized_client(
                "Client is not authorized for the authorization_code grant",
            ));
        }

        // 4. Scopes: every requested token must be allowed, or the whole
        //    request fails
        let scope = ScopeSet::parse(&request.scope);
        if let Err(offending) = client.validate_scopes(&scope) {
            return Err(AuthError::invalid_scope(format!(
                "Scope '{offending}' is not allowed for this client"
            )));
        }

        // 5. PKCE
        let (code_challenge, code_challenge_method) = self.validate_pkce(&client, request)?;

        // 6. Mint and persist the code
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code: AuthorizationCode::generate_code(),
            client_id: client.client_id.clone(),
            subject: request.subject.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope,
            code_challenge,
            code_challenge_method,
            nonce: request.nonce.clone(),
            state: request.state.clone(),
            created_at: now,
            expires_at: now + self.config.code_lifetime,
            consumed_at: None,
        };

        self.codes.create(&code).await?;

        tracing::info!(
            client_id = %code.client_id,
            scope = %code.scope,
            "Authorization code issued"
        );

        Ok(code)
    }

    /// Validates the PKCE parameters of a request against the client policy.
    fn validate_pkce(
        &self,
        client: &Client,
        request: &AuthorizeRequest,
    ) -> AuthResult<(Option<String>, Option<PkceMethod>)> {
        if client.requires_pkce() && request.code_challenge.is_none() {
            return Err(AuthError::invalid_request(
                "code_challenge is required for this client",
            ));
        }

        // Challenge and method travel together
        if request.code_challenge.is_some() != request.code_challenge_method.is_some() {
            return Err(AuthError::invalid_request(
                "code_challenge and code_challenge_method must be provided together",
            ));
        }

        let Some(ref challenge) = request.code_challenge else {
            return Ok((None, None));
        };

        let method = request
            .code_challenge_method
            .as_deref()
            .map(PkceMethod::parse)
            .transpose()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?
            .unwrap_or_default();

        let challenge = PkceChallenge::new(challenge.clone())
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        Ok((Some(challenge.into_inner()), Some(method)))
    }

    /// Gets the client store reference.
    #[must_use]
    pub fn clients(&self) -> &Arc<dyn ClientStore> {
        &self.clients
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }
}
