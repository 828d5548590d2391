//! Token service: grant dispatch, token issuance, verification,
//! revocation, and introspection.
//!
//! The service is stateless between requests. All durable state lives
//! behind the storage traits; the only transactional requirement is the
//! atomic authorization-code consume, which the [`CodeStore`] contract
//! carries.
//!
//! # Usage
//!
//! ```ignore
//! use gatehouse_auth::token::{TokenConfig, TokenService};
//!
//! let config = TokenConfig::new("https://auth.example.com");
//! let service = TokenService::new(jwt, codes, access_tokens, refresh_tokens, config);
//!
//! let response = service.exchange(&request, Some(&client)).await?;
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::pkce::{PkceChallenge, PkceVerifier};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::storage::{AccessTokenStore, CodeStore, RefreshTokenStore};
use crate::token::introspection::{IntrospectionRequest, IntrospectionResponse};
use crate::token::jwt::{AccessClaims, IdClaims, JwtService};
use crate::token::revocation::{RevocationRequest, TokenTypeHint};
use crate::types::code::AuthorizationCode;
use crate::types::token::{AccessToken, RefreshToken, generate_token, hash_token};
use crate::types::{Client, GrantType, ScopeSet};

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Server issuer URL (the `iss` claim).
    pub issuer: String,

    /// Default access token lifetime. Overridable per client.
    pub access_token_lifetime: Duration,

    /// Default refresh token lifetime. Overridable per client.
    pub refresh_token_lifetime: Duration,

    /// ID token lifetime.
    pub id_token_lifetime: Duration,

    /// Whether to rotate refresh tokens on use.
    ///
    /// Off by default: a refresh keeps the same long-lived token and only
    /// stamps its last-used time. Turning this on revokes the presented
    /// token and issues a replacement on every refresh.
    pub rotate_refresh_tokens: bool,

    /// Whether access tokens are issued as signed self-contained JWT
    /// assertions instead of opaque strings. Either way the token is
    /// stored by digest, so revocation and introspection behave the same.
    pub signed_access_tokens: bool,
}

impl TokenConfig {
    /// Creates a new token configuration with defaults.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: Duration::seconds(3600),
            refresh_token_lifetime: Duration::seconds(2_592_000),
            id_token_lifetime: Duration::seconds(3600),
            rotate_refresh_tokens: false,
            signed_access_tokens: false,
        }
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Sets whether to rotate refresh tokens on use.
    #[must_use]
    pub fn with_rotate_refresh_tokens(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }

    /// Sets whether access tokens are signed JWT assertions.
    #[must_use]
    pub fn with_signed_access_tokens(mut self, signed: bool) -> Self {
        self.signed_access_tokens = signed;
        self
    }
}

/// Token service for the OAuth 2.0 token, revocation, and introspection
/// endpoints.
pub struct TokenService {
    /// JWT service for ID tokens and signed assertions.
    jwt: Arc<JwtService>,

    /// Authorization code store.
    codes: Arc<dyn CodeStore>,

    /// Access token store.
    access_tokens: Arc<dyn AccessTokenStore>,

    /// Refresh token store.
    refresh_tokens: Arc<dyn RefreshTokenStore>,

    /// Service configuration.
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        jwt: Arc<JwtService>,
        codes: Arc<dyn CodeStore>,
        access_tokens: Arc<dyn AccessTokenStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        config: TokenConfig,
    ) -> Self {
        Self {
            jwt,
            codes,
            access_tokens,
            refresh_tokens,
            config,
        }
    }

    /// Dispatches a token request by grant type.
    ///
    /// `client` is the authenticated client, when the transport layer could
    /// authenticate one. The refresh_token grant tolerates an absent
    /// client; the other grants require one.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedGrantType` for unknown grant types, or whatever
    /// the sub-flow produces.
    pub async fn exchange(
        &self,
        request: &TokenRequest,
        client: Option<&Client>,
    ) -> AuthResult<TokenResponse> {
        match request.grant_type.as_str() {
            "authorization_code" => {
                let client = client.ok_or_else(|| {
                    AuthError::invalid_client("Client authentication required")
                })?;
                self.exchange_code(request, client).await
            }
            "refresh_token" => self.refresh(request, client).await,
            "client_credentials" => {
                let client = client.ok_or_else(|| {
                    AuthError::invalid_client("Client authentication required")
                })?;
                self.client_credentials(request, client).await
            }
            other => Err(AuthError::unsupported_grant_type(other)),
        }
    }

    /// Exchanges an authorization code for an access and refresh token.
    ///
    /// The code is consumed with a single atomic conditional update before
    /// any further validation, so a replayed or concurrently redeemed code
    /// fails with `invalid_grant` no matter how the race interleaves.
    ///
    /// # Errors
    ///
    /// - Missing `code` (`InvalidRequest`)
    /// - Unknown, consumed, or expired code (`InvalidGrant`)
    /// - Redirect URI mismatch (`InvalidGrant`)
    /// - Code issued to a different client (`InvalidClient`)
    /// - Missing or malformed `code_verifier` when the code carries a
    ///   challenge (`InvalidRequest`)
    /// - Verifier mismatch (`PkceVerificationFailed`)
    pub async fn exchange_code(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        let code_value = request
            .code
            .as_ref()
            .ok_or_else(|| AuthError::invalid_request("Missing code parameter"))?;

        // Atomic check-and-mark: exactly one redemption can ever pass this
        // point for a given code.
        let code = self.codes.consume(code_value).await?;

        if code.is_expired() {
            return Err(AuthError::invalid_grant("Authorization code expired"));
        }

        // Redirect URI must repeat the authorization request exactly
        if request.redirect_uri.as_deref() != Some(code.redirect_uri.as_str()) {
            return Err(AuthError::invalid_grant(
                "redirect_uri does not match the authorization request",
            ));
        }

        if code.client_id != client.client_id {
            return Err(AuthError::invalid_client(
                "Authorization code was issued to a different client",
            ));
        }

        self.verify_code_challenge(&code, request)?;

        let (refresh_value, refresh_record) = self
            .issue_refresh_token(&code.subject, client, code.scope.clone())
            .await?;

        let (access_value, access_record) = self
            .issue_access_token(
                Some(code.subject.clone()),
                client,
                code.scope.clone(),
                Some(refresh_record.id),
            )
            .await?;

        let mut response = TokenResponse::new(
            access_value,
            lifetime_seconds(&access_record),
            code.scope.to_string(),
        )
        .with_refresh_token(refresh_value);

        if code.scope.contains("openid") {
            response = response.with_id_token(self.issue_id_token(&code, client)?);
        }

        tracing::info!(
            client_id = %client.client_id,
            scope = %code.scope,
            "Authorization code exchanged"
        );

        Ok(response)
    }

    /// Verifies the PKCE binding stored on a code against the request.
    fn verify_code_challenge(
        &self,
        code: &AuthorizationCode,
        request: &TokenRequest,
    ) -> AuthResult<()> {
        let Some(ref challenge) = code.code_challenge else {
            return Ok(());
        };

        let verifier = request
            .code_verifier
            .as_ref()
            .ok_or_else(|| AuthError::invalid_request("Missing code_verifier parameter"))?;

        let challenge = PkceChallenge::new(challenge.clone())
            .map_err(|e| AuthError::internal(format!("Stored PKCE challenge invalid: {e}")))?;
        let verifier = PkceVerifier::new(verifier.clone())
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        challenge
            .verify(&verifier, code.code_challenge_method.unwrap_or_default())
            .map_err(|_| AuthError::PkceVerificationFailed)
    }

    /// Mints a new access token from a refresh token.
    ///
    /// The refresh token itself is not reissued by default; its
    /// `last_used_at` is stamped. With rotation enabled the presented
    /// token is revoked and a replacement is returned.
    ///
    /// # Errors
    ///
    /// - Missing `refresh_token` (`InvalidRequest`)
    /// - Unknown, revoked, or expired token (`InvalidGrant`)
    /// - Token owned by a different client (`InvalidClient`)
    /// - Requested scope exceeding the original grant (`InvalidScope`)
    pub async fn refresh(
        &self,
        request: &TokenRequest,
        client: Option<&Client>,
    ) -> AuthResult<TokenResponse> {
        let token_value = request
            .refresh_token
            .as_ref()
            .ok_or_else(|| AuthError::invalid_request("Missing refresh_token parameter"))?;

        let token_hash = hash_token(token_value);
        let stored = self
            .refresh_tokens
            .find_by_hash(&token_hash)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        if stored.is_revoked() {
            return Err(AuthError::invalid_grant("Refresh token has been revoked"));
        }
        if stored.is_expired() {
            return Err(AuthError::invalid_grant("Refresh token has expired"));
        }

        // A presented client identity must own the token
        let presented_client_id = client
            .map(|c| c.client_id.as_str())
            .or(request.client_id.as_deref());
        if let Some(id) = presented_client_id
            && id != stored.client_id
        {
            return Err(AuthError::invalid_client(
                "Refresh token was issued to a different client",
            ));
        }

        if let Some(client) = client
            && !client.is_grant_type_allowed(GrantType::RefreshToken)
        {
            return Err(AuthError::unauthorized_client(
                "Client is not authorized for the refresh_token grant",
            ));
        }

        let scope = determine_refresh_scope(request, &stored)?;

        let access_lifetime = client
            .map(|c| Duration::seconds(c.access_token_lifetime_secs()))
            .unwrap_or(self.config.access_token_lifetime);
        let (access_value, access_record) = self
            .create_access_token(
                Some(stored.subject.clone()),
                &stored.client_id,
                scope.clone(),
                access_lifetime,
                Some(stored.id),
            )
            .await?;

        let mut response = TokenResponse::new(
            access_value,
            lifetime_seconds(&access_record),
            scope.to_string(),
        );

        if self.config.rotate_refresh_tokens {
            self.refresh_tokens.revoke(&token_hash).await?;

            let new_value = generate_token();
            let replacement = RefreshToken {
                id: Uuid::new_v4(),
                token_hash: hash_token(&new_value),
                client_id: stored.client_id.clone(),
                subject: stored.subject.clone(),
                scope,
                created_at: OffsetDateTime::now_utc(),
                // Rotation must not extend the original grant
                expires_at: stored.expires_at,
                revoked_at: None,
                last_used_at: None,
            };
            self.refresh_tokens.create(&replacement).await?;
            response = response.with_refresh_token(new_value);
        } else {
            self.refresh_tokens.touch_last_used(&token_hash).await?;
        }

        tracing::info!(client_id = %stored.client_id, "Access token refreshed");

        Ok(response)
    }

    /// Issues an access token for machine-to-machine authentication.
    ///
    /// No subject, no refresh token.
    ///
    /// # Errors
    ///
    /// - Client not registered for the grant (`UnauthorizedClient`)
    /// - Requested scope outside the allowed set (`InvalidScope`)
    pub async fn client_credentials(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        if !client.is_grant_type_allowed(GrantType::ClientCredentials) {
            return Err(AuthError::unauthorized_client(
                "Client is not authorized for the client_credentials grant",
            ));
        }

        let scope = ScopeSet::parse(request.scope.as_deref().unwrap_or(""));
        if let Err(offending) = client.validate_scopes(&scope) {
            return Err(AuthError::invalid_scope(format!(
                "Scope '{offending}' is not allowed for this client"
            )));
        }

        let (access_value, access_record) = self
            .issue_access_token(None, client, scope.clone(), None)
            .await?;

        tracing::info!(client_id = %client.client_id, "Client credentials token issued");

        Ok(TokenResponse::new(
            access_value,
            lifetime_seconds(&access_record),
            scope.to_string(),
        ))
    }

    /// Issues and persists an access token for a client.
    ///
    /// Returns the plaintext value, which is never retrievable again, and
    /// the stored record.
    pub async fn issue_access_token(
        &self,
        subject: Option<String>,
        client: &Client,
        scope: ScopeSet,
        refresh_token_id: Option<Uuid>,
    ) -> AuthResult<(String, AccessToken)> {
        let lifetime = Duration::seconds(client.access_token_lifetime_secs());
        self.create_access_token(subject, &client.client_id, scope, lifetime, refresh_token_id)
            .await
    }

    async fn create_access_token(
        &self,
        subject: Option<String>,
        client_id: &str,
        scope: ScopeSet,
        lifetime: Duration,
        refresh_token_id: Option<Uuid>,
    ) -> AuthResult<(String, AccessToken)> {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();

        let value = if self.config.signed_access_tokens {
            let claims = AccessClaims {
                iss: self.config.issuer.clone(),
                sub: subject.clone().unwrap_or_else(|| client_id.to_string()),
                exp: (now + lifetime).unix_timestamp(),
                iat: now.unix_timestamp(),
                jti: id.to_string(),
                scope: scope.to_string(),
                client_id: client_id.to_string(),
            };
            self.jwt
                .encode(&claims)
                .map_err(|e| AuthError::internal(format!("Failed to encode access token: {e}")))?
        } else {
            generate_token()
        };

        let record = AccessToken {
            id,
            token_hash: hash_token(&value),
            client_id: client_id.to_string(),
            subject,
            scope,
            created_at: now,
            expires_at: now + lifetime,
            revoked_at: None,
            refresh_token_id,
        };
        self.access_tokens.create(&record).await?;

        Ok((value, record))
    }

    /// Issues and persists a refresh token.
    ///
    /// Returns the plaintext value, which is never retrievable again, and
    /// the stored record.
    pub async fn issue_refresh_token(
        &self,
        subject: &str,
        client: &Client,
        scope: ScopeSet,
    ) -> AuthResult<(String, RefreshToken)> {
        let now = OffsetDateTime::now_utc();
        let value = generate_token();

        let record = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: hash_token(&value),
            client_id: client.client_id.clone(),
            subject: subject.to_string(),
            scope,
            created_at: now,
            expires_at: now + Duration::seconds(client.refresh_token_lifetime_secs()),
            revoked_at: None,
            last_used_at: None,
        };
        self.refresh_tokens.create(&record).await?;

        Ok((value, record))
    }

    /// Issues an OpenID Connect ID token for a redeemed code.
    fn issue_id_token(&self, code: &AuthorizationCode, client: &Client) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = IdClaims {
            iss: self.config.issuer.clone(),
            sub: code.subject.clone(),
            aud: client.client_id.clone(),
            exp: (now + self.config.id_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            nonce: code.nonce.clone(),
        };

        self.jwt
            .encode(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode ID token: {e}")))
    }

    /// Verifies a presented access token.
    ///
    /// Returns `None` for tokens that are unknown, revoked, or expired.
    /// JWT-shaped tokens must additionally carry a valid signature and
    /// unexpired claims; a token failing either check is indistinguishable
    /// from one that was never issued.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures, never for invalid
    /// tokens.
    pub async fn verify_access_token(&self, raw: &str) -> AuthResult<Option<AccessClaims>> {
        if looks_like_jwt(raw) && self.jwt.decode::<AccessClaims>(raw).is_err() {
            return Ok(None);
        }

        let Some(record) = self.access_tokens.find_by_hash(&hash_token(raw)).await? else {
            return Ok(None);
        };
        if !record.is_valid() {
            return Ok(None);
        }

        Ok(Some(AccessClaims {
            iss: self.config.issuer.clone(),
            sub: record
                .subject
                .clone()
                .unwrap_or_else(|| record.client_id.clone()),
            exp: record.expires_at.unix_timestamp(),
            iat: record.created_at.unix_timestamp(),
            jti: record.id.to_string(),
            scope: record.scope.to_string(),
            client_id: record.client_id,
        }))
    }

    /// Revokes a token (RFC 7009).
    ///
    /// The hinted store is tried first; on a miss the other store is
    /// tried. Revoking an unknown or already-revoked token succeeds —
    /// nothing reports which case occurred.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures.
    pub async fn revoke(&self, request: &RevocationRequest) -> AuthResult<()> {
        let token_hash = hash_token(&request.token);

        match request.token_type_hint {
            Some(TokenTypeHint::RefreshToken) => {
                if !self.refresh_tokens.revoke(&token_hash).await? {
                    self.access_tokens.revoke(&token_hash).await?;
                }
            }
            _ => {
                if !self.access_tokens.revoke(&token_hash).await? {
                    self.refresh_tokens.revoke(&token_hash).await?;
                }
            }
        }

        tracing::debug!("Token revocation processed");
        Ok(())
    }

    /// Introspects a token (RFC 7662).
    ///
    /// Missing, expired, and revoked tokens all yield `{active: false}`
    /// with no distinguishing signal; storage failures are logged and also
    /// reported inactive rather than leaked.
    pub async fn introspect(&self, request: &IntrospectionRequest) -> IntrospectionResponse {
        let token_hash = hash_token(&request.token);

        let (first, second) = match request.token_type_hint {
            Some(TokenTypeHint::RefreshToken) => (TokenKind::Refresh, TokenKind::Access),
            _ => (TokenKind::Access, TokenKind::Refresh),
        };

        for kind in [first, second] {
            if let Some(response) = self.introspect_kind(kind, &token_hash).await {
                return response;
            }
        }

        IntrospectionResponse::inactive()
    }

    async fn introspect_kind(
        &self,
        kind: TokenKind,
        token_hash: &str,
    ) -> Option<IntrospectionResponse> {
        match kind {
            TokenKind::Access => match self.access_tokens.find_by_hash(token_hash).await {
                Ok(Some(record)) if record.is_valid() => {
                    let mut response = IntrospectionResponse::active()
                        .with_scope(record.scope.to_string())
                        .with_client_id(record.client_id)
                        .with_token_type("Bearer")
                        .with_exp(record.expires_at.unix_timestamp())
                        .with_iat(record.created_at.unix_timestamp());
                    if let Some(subject) = record.subject {
                        response = response.with_sub(subject);
                    }
                    Some(response)
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Introspection lookup failed");
                    None
                }
            },
            TokenKind::Refresh => match self.refresh_tokens.find_by_hash(token_hash).await {
                Ok(Some(record)) if record.is_valid() => Some(
                    IntrospectionResponse::active()
                        .with_scope(record.scope.to_string())
                        .with_client_id(record.client_id)
                        .with_sub(record.subject)
                        .with_exp(record.expires_at.unix_timestamp())
                        .with_iat(record.created_at.unix_timestamp()),
                ),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Introspection lookup failed");
                    None
                }
            },
        }
    }

    /// Gets the JWT service reference.
    #[must_use]
    pub fn jwt(&self) -> &Arc<JwtService> {
        &self.jwt
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }
}

#[derive(Clone, Copy)]
enum TokenKind {
    Access,
    Refresh,
}

/// Rough shape check for signed assertions: header.payload.signature.
fn looks_like_jwt(raw: &str) -> bool {
    raw.matches('.').count() == 2
}

fn lifetime_seconds(record: &AccessToken) -> u64 {
    (record.expires_at - record.created_at).whole_seconds().max(0) as u64
}

/// Checks that verified token claims cover every required scope.
///
/// Handlers call this at the top of their body; required scopes are plain
/// arguments rather than declarative metadata on the route.
///
/// # Errors
///
/// Returns `InvalidScope` naming the first missing scope.
pub fn require_scopes(claims: &AccessClaims, required: &ScopeSet) -> AuthResult<()> {
    let granted = ScopeSet::parse(&claims.scope);
    for scope in required.iter() {
        if !granted.contains(scope) {
            return Err(AuthError::invalid_scope(format!(
                "Token is missing the '{scope}' scope"
            )));
        }
    }
    Ok(())
}

/// Determines the scope for a refreshed token.
///
/// Per RFC 6749 Section 6 the scope can be narrowed but never expanded.
fn determine_refresh_scope(
    request: &TokenRequest,
    stored: &RefreshToken,
) -> AuthResult<ScopeSet> {
    match request.scope.as_deref() {
        None => Ok(stored.scope.clone()),
        Some(raw) => {
            let requested = ScopeSet::parse(raw);
            if !requested.is_subset(&stored.scope) {
                return Err(AuthError::invalid_scope(
                    "Requested scope exceeds the original grant",
                ));
            }
            Ok(requested)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::jwt::SigningKeyPair;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct MockCodeStore {
        codes: RwLock<HashMap<String, AuthorizationCode>>,
    }

    impl MockCodeStore {
        fn new() -> Self {
            Self {
                codes: RwLock::new(HashMap::new()),
            }
        }

        fn add(&self, code: AuthorizationCode) {
            self.codes.write().unwrap().insert(code.code.clone(), code);
        }
    }

    #[async_trait::async_trait]
    impl CodeStore for MockCodeStore {
        async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
            self.add(code.clone());
            Ok(())
        }

        async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
            Ok(self.codes.read().unwrap().get(code).cloned())
        }

        async fn consume(&self, code: &str) -> AuthResult<AuthorizationCode> {
            let mut codes = self.codes.write().unwrap();
            let record = codes
                .get_mut(code)
                .ok_or_else(|| AuthError::invalid_grant("Unknown authorization code"))?;
            if record.is_consumed() {
                return Err(AuthError::invalid_grant("Authorization code already used"));
            }
            record.consumed_at = Some(OffsetDateTime::now_utc());
            Ok(record.clone())
        }

        async fn cleanup_expired(&self) -> AuthResult<u64> {
            let mut codes = self.codes.write().unwrap();
            let before = codes.len();
            codes.retain(|_, c| !c.is_expired());
            Ok((before - codes.len()) as u64)
        }
    }

    struct MockAccessTokenStore {
        tokens: RwLock<HashMap<String, AccessToken>>,
    }

    impl MockAccessTokenStore {
        fn new() -> Self {
            Self {
                tokens: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl AccessTokenStore for MockAccessTokenStore {
        async fn create(&self, token: &AccessToken) -> AuthResult<()> {
            self.tokens
                .write()
                .unwrap()
                .insert(token.token_hash.clone(), token.clone());
            Ok(())
        }

        async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<AccessToken>> {
            Ok(self.tokens.read().unwrap().get(token_hash).cloned())
        }

        async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(token_hash) {
                Some(token) => {
                    if token.revoked_at.is_none() {
                        token.revoked_at = Some(OffsetDateTime::now_utc());
                    }
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn cleanup_expired(&self) -> AuthResult<u64> {
            let mut tokens = self.tokens.write().unwrap();
            let before = tokens.len();
            tokens.retain(|_, t| !t.is_expired());
            Ok((before - tokens.len()) as u64)
        }
    }

    struct MockRefreshTokenStore {
        tokens: RwLock<HashMap<String, RefreshToken>>,
    }

    impl MockRefreshTokenStore {
        fn new() -> Self {
            Self {
                tokens: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RefreshTokenStore for MockRefreshTokenStore {
        async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
            self.tokens
                .write()
                .unwrap()
                .insert(token.token_hash.clone(), token.clone());
            Ok(())
        }

        async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(self.tokens.read().unwrap().get(token_hash).cloned())
        }

        async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(token_hash) {
                Some(token) => {
                    if token.revoked_at.is_none() {
                        token.revoked_at = Some(OffsetDateTime::now_utc());
                    }
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn touch_last_used(&self, token_hash: &str) -> AuthResult<()> {
            let mut tokens = self.tokens.write().unwrap();
            if let Some(token) = tokens.get_mut(token_hash) {
                token.last_used_at = Some(OffsetDateTime::now_utc());
            }
            Ok(())
        }

        async fn cleanup_expired(&self) -> AuthResult<u64> {
            let mut tokens = self.tokens.write().unwrap();
            let before = tokens.len();
            tokens.retain(|_, t| !t.is_expired());
            Ok((before - tokens.len()) as u64)
        }
    }

    struct Fixture {
        service: TokenService,
        codes: Arc<MockCodeStore>,
        access_tokens: Arc<MockAccessTokenStore>,
        refresh_tokens: Arc<MockRefreshTokenStore>,
    }

    fn make_fixture_with(config: TokenConfig) -> Fixture {
        let key = SigningKeyPair::generate().unwrap();
        let jwt = Arc::new(JwtService::new(key, config.issuer.clone()));

        let codes = Arc::new(MockCodeStore::new());
        let access_tokens = Arc::new(MockAccessTokenStore::new());
        let refresh_tokens = Arc::new(MockRefreshTokenStore::new());

        let service = TokenService::new(
            jwt,
            codes.clone(),
            access_tokens.clone(),
            refresh_tokens.clone(),
            config,
        );

        Fixture {
            service,
            codes,
            access_tokens,
            refresh_tokens,
        }
    }

    fn make_fixture() -> Fixture {
        make_fixture_with(TokenConfig::new("https://auth.example.com"))
    }

    fn make_client() -> Client {
        Client {
            client_id: "web-app".to_string(),
            client_secret: None,
            name: "Web App".to_string(),
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            response_types: vec!["code".to_string()],
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            scopes: vec![],
            confidential: false,
            active: true,
            pkce_required: None,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        }
    }

    fn make_machine_client() -> Client {
        Client {
            client_id: "backend-service".to_string(),
            client_secret: Some(Client::hash_secret("s3cret")),
            name: "Backend Service".to_string(),
            grant_types: vec![GrantType::ClientCredentials],
            response_types: vec![],
            redirect_uris: vec![],
            scopes: vec!["read".to_string(), "write".to_string()],
            confidential: true,
            active: true,
            pkce_required: None,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        }
    }

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    fn make_code(verifier: Option<&str>, scope: &str) -> AuthorizationCode {
        let now = OffsetDateTime::now_utc();
        let (challenge, method) = match verifier {
            Some(v) => {
                let verifier = PkceVerifier::new(v.to_string()).unwrap();
                (
                    Some(PkceChallenge::from_verifier(&verifier).into_inner()),
                    Some(crate::oauth::pkce::PkceMethod::S256),
                )
            }
            None => (None, None),
        };

        AuthorizationCode {
            id: Uuid::new_v4(),
            code: "test-auth-code".to_string(),
            client_id: "web-app".to_string(),
            subject: "user-1".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scope: ScopeSet::parse(scope),
            code_challenge: challenge,
            code_challenge_method: method,
            nonce: Some("test-nonce".to_string()),
            state: Some("test-state".to_string()),
            created_at: now,
            expires_at: now + Duration::minutes(10),
            consumed_at: None,
        }
    }

    fn code_request(code: &str, verifier: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code.to_string()),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: verifier.map(str::to_string),
            client_id: Some("web-app".to_string()),
            client_secret: None,
            refresh_token: None,
            scope: None,
        }
    }

    fn refresh_request(token: &str, scope: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: "refresh_token".to_string(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            client_id: None,
            client_secret: None,
            refresh_token: Some(token.to_string()),
            scope: scope.map(str::to_string),
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[tokio::test]
    async fn test_exchange_unknown_grant_type() {
        let fx = make_fixture();
        let client = make_client();

        let mut request = code_request("x", None);
        request.grant_type = "implicit".to_string();

        let result = fx.service.exchange(&request, Some(&client)).await;
        assert!(matches!(result, Err(AuthError::UnsupportedGrantType { .. })));
    }

    #[tokio::test]
    async fn test_exchange_requires_client_for_code_grant() {
        let fx = make_fixture();
        let result = fx.service.exchange(&code_request("x", None), None).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    // =========================================================================
    // Authorization code grant
    // =========================================================================

    #[tokio::test]
    async fn test_exchange_code_success() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(Some(VERIFIER), "openid profile"));

        let response = fx
            .service
            .exchange_code(&code_request("test-auth-code", Some(VERIFIER)), &client)
            .await
            .unwrap();

        assert!(!response.access_token.is_empty());
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.scope, "openid profile");
        assert!(response.refresh_token.is_some());
        // openid scope present, so an ID token is issued
        assert!(response.id_token.is_some());

        // Only digests reach the stores
        let stored = fx
            .access_tokens
            .find_by_hash(&hash_token(&response.access_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.subject.as_deref(), Some("user-1"));
        assert!(stored.refresh_token_id.is_some());
    }

    #[tokio::test]
    async fn test_exchange_code_without_openid_scope_has_no_id_token() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(Some(VERIFIER), "profile"));

        let response = fx
            .service
            .exchange_code(&code_request("test-auth-code", Some(VERIFIER)), &client)
            .await
            .unwrap();
        assert!(response.id_token.is_none());
    }

    #[tokio::test]
    async fn test_exchange_code_missing_code() {
        let fx = make_fixture();
        let client = make_client();

        let mut request = code_request("x", None);
        request.code = None;

        let result = fx.service.exchange_code(&request, &client).await;
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_unknown_code() {
        let fx = make_fixture();
        let client = make_client();

        let result = fx
            .service
            .exchange_code(&code_request("no-such-code", Some(VERIFIER)), &client)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_replay_rejected() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(Some(VERIFIER), "openid"));

        let request = code_request("test-auth-code", Some(VERIFIER));
        assert!(fx.service.exchange_code(&request, &client).await.is_ok());

        let replay = fx.service.exchange_code(&request, &client).await;
        assert!(matches!(replay, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_expired() {
        let fx = make_fixture();
        let client = make_client();

        let mut code = make_code(Some(VERIFIER), "openid");
        code.expires_at = OffsetDateTime::now_utc() - Duration::minutes(1);
        fx.codes.add(code);

        let result = fx
            .service
            .exchange_code(&code_request("test-auth-code", Some(VERIFIER)), &client)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_redirect_uri_mismatch() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(Some(VERIFIER), "openid"));

        let mut request = code_request("test-auth-code", Some(VERIFIER));
        request.redirect_uri = Some("https://evil.example.com/callback".to_string());

        let result = fx.service.exchange_code(&request, &client).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_client_mismatch() {
        let fx = make_fixture();
        let mut client = make_client();
        client.client_id = "different-client".to_string();
        fx.codes.add(make_code(Some(VERIFIER), "openid"));

        let result = fx
            .service
            .exchange_code(&code_request("test-auth-code", Some(VERIFIER)), &client)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_wrong_verifier() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(Some(VERIFIER), "openid"));

        let wrong = "wrong-verifier-that-is-long-enough-for-pkce-checks";
        let result = fx
            .service
            .exchange_code(&code_request("test-auth-code", Some(wrong)), &client)
            .await;
        assert!(matches!(result, Err(AuthError::PkceVerificationFailed)));
    }

    #[tokio::test]
    async fn test_exchange_code_missing_verifier() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(Some(VERIFIER), "openid"));

        let result = fx
            .service
            .exchange_code(&code_request("test-auth-code", None), &client)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_without_challenge_needs_no_verifier() {
        let fx = make_fixture();
        let client = make_client();
        fx.codes.add(make_code(None, "openid"));

        let result = fx
            .service
            .exchange_code(&code_request("test-auth-code", None), &client)
            .await;
        assert!(result.is_ok());
    }

    // =========================================================================
    // Refresh token grant
    // =========================================================================

    async fn seed_refresh_token(fx: &Fixture, client_id: &str, scope: &str) -> String {
        let value = generate_token();
        let now = OffsetDateTime::now_utc();
        let record = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: hash_token(&value),
            client_id: client_id.to_string(),
            subject: "user-1".to_string(),
            scope: ScopeSet::parse(scope),
            created_at: now,
            expires_at: now + Duration::days(30),
            revoked_at: None,
            last_used_at: None,
        };
        fx.refresh_tokens.create(&record).await.unwrap();
        value
    }

    #[tokio::test]
    async fn test_refresh_success_without_rotation() {
        let fx = make_fixture();
        let client = make_client();
        let value = seed_refresh_token(&fx, "web-app", "openid profile").await;

        let response = fx
            .service
            .refresh(&refresh_request(&value, None), Some(&client))
            .await
            .unwrap();

        assert!(!response.access_token.is_empty());
        assert_eq!(response.scope, "openid profile");
        // No rotation: the client keeps its existing refresh token
        assert!(response.refresh_token.is_none());
        // ID tokens are not reissued on refresh
        assert!(response.id_token.is_none());

        // last_used_at was stamped
        let stored = fx
            .refresh_tokens
            .find_by_hash(&hash_token(&value))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_used_at.is_some());
        assert!(!stored.is_revoked());
    }

    #[tokio::test]
    async fn test_refresh_missing_token() {
        let fx = make_fixture();
        let client = make_client();

        let mut request = refresh_request("x", None);
        request.refresh_token = None;

        let result = fx.service.refresh(&request, Some(&client)).await;
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn test_refresh_unknown_token() {
        let fx = make_fixture();
        let client = make_client();

        let result = fx
            .service
            .refresh(&refresh_request("unknown-token", None), Some(&client))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_revoked_token() {
        let fx = make_fixture();
        let client = make_client();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;
        fx.refresh_tokens.revoke(&hash_token(&value)).await.unwrap();

        let result = fx
            .service
            .refresh(&refresh_request(&value, None), Some(&client))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_expired_token() {
        let fx = make_fixture();
        let client = make_client();

        let value = generate_token();
        let now = OffsetDateTime::now_utc();
        let record = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: hash_token(&value),
            client_id: "web-app".to_string(),
            subject: "user-1".to_string(),
            scope: ScopeSet::parse("openid"),
            created_at: now - Duration::days(60),
            expires_at: now - Duration::days(1),
            revoked_at: None,
            last_used_at: None,
        };
        fx.refresh_tokens.create(&record).await.unwrap();

        let result = fx
            .service
            .refresh(&refresh_request(&value, None), Some(&client))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_client_mismatch() {
        let fx = make_fixture();
        let client = make_client();
        let value = seed_refresh_token(&fx, "other-client", "openid").await;

        let result = fx
            .service
            .refresh(&refresh_request(&value, None), Some(&client))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_refresh_client_id_in_body_must_match() {
        let fx = make_fixture();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        let mut request = refresh_request(&value, None);
        request.client_id = Some("other-client".to_string());

        // No authenticated client, but the supplied client_id still has to own the token
        let result = fx.service.refresh(&request, None).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_refresh_without_any_client_identity() {
        let fx = make_fixture();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        let result = fx.service.refresh(&refresh_request(&value, None), None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_scope_narrowing() {
        let fx = make_fixture();
        let client = make_client();
        let value = seed_refresh_token(&fx, "web-app", "openid profile email").await;

        let response = fx
            .service
            .refresh(&refresh_request(&value, Some("openid email")), Some(&client))
            .await
            .unwrap();
        assert_eq!(response.scope, "email openid");
    }

    #[tokio::test]
    async fn test_refresh_scope_expansion_rejected() {
        let fx = make_fixture();
        let client = make_client();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        let result = fx
            .service
            .refresh(
                &refresh_request(&value, Some("openid profile")),
                Some(&client),
            )
            .await;
        assert!(matches!(result, Err(AuthError::InvalidScope { .. })));
    }

    #[tokio::test]
    async fn test_refresh_with_rotation_enabled() {
        let config = TokenConfig::new("https://auth.example.com").with_rotate_refresh_tokens(true);
        let fx = make_fixture_with(config);
        let client = make_client();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        let response = fx
            .service
            .refresh(&refresh_request(&value, None), Some(&client))
            .await
            .unwrap();

        // Rotation: a replacement token comes back and the old one is dead
        let new_value = response.refresh_token.expect("rotated token");
        assert_ne!(new_value, value);

        let old = fx
            .refresh_tokens
            .find_by_hash(&hash_token(&value))
            .await
            .unwrap()
            .unwrap();
        assert!(old.is_revoked());

        let replacement = fx
            .refresh_tokens
            .find_by_hash(&hash_token(&new_value))
            .await
            .unwrap()
            .unwrap();
        assert!(replacement.is_valid());
        assert_eq!(replacement.expires_at, old.expires_at);
    }

    #[tokio::test]
    async fn test_refresh_grant_not_allowed_for_client() {
        let fx = make_fixture();
        let mut client = make_client();
        client.grant_types = vec![GrantType::AuthorizationCode];
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        let result = fx
            .service
            .refresh(&refresh_request(&value, None), Some(&client))
            .await;
        assert!(matches!(result, Err(AuthError::UnauthorizedClient { .. })));
    }

    // =========================================================================
    // Client credentials grant
    // =========================================================================

    fn client_credentials_request(scope: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: "client_credentials".to_string(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            client_id: Some("backend-service".to_string()),
            client_secret: Some("s3cret".to_string()),
            refresh_token: None,
            scope: scope.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_client_credentials_success() {
        let fx = make_fixture();
        let client = make_machine_client();

        let response = fx
            .service
            .client_credentials(&client_credentials_request(Some("read")), &client)
            .await
            .unwrap();

        assert!(!response.access_token.is_empty());
        assert_eq!(response.scope, "read");
        // Never a refresh token for machine clients
        assert!(response.refresh_token.is_none());
        assert!(response.id_token.is_none());

        // The stored record has no subject
        let stored = fx
            .access_tokens
            .find_by_hash(&hash_token(&response.access_token))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.subject.is_none());
    }

    #[tokio::test]
    async fn test_client_credentials_grant_not_allowed() {
        let fx = make_fixture();
        let client = make_client(); // no client_credentials grant

        let result = fx
            .service
            .client_credentials(&client_credentials_request(None), &client)
            .await;
        assert!(matches!(result, Err(AuthError::UnauthorizedClient { .. })));
    }

    #[tokio::test]
    async fn test_client_credentials_scope_not_allowed() {
        let fx = make_fixture();
        let client = make_machine_client();

        let result = fx
            .service
            .client_credentials(&client_credentials_request(Some("read admin")), &client)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidScope { .. })));
    }

    // =========================================================================
    // Verification
    // =========================================================================

    #[tokio::test]
    async fn test_verify_access_token_roundtrip() {
        let fx = make_fixture();
        let client = make_client();

        let (value, _) = fx
            .service
            .issue_access_token(
                Some("user-1".to_string()),
                &client,
                ScopeSet::parse("openid"),
                None,
            )
            .await
            .unwrap();

        let claims = fx.service.verify_access_token(&value).await.unwrap().unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.client_id, "web-app");
        assert_eq!(claims.scope, "openid");
    }

    #[tokio::test]
    async fn test_verify_access_token_unknown() {
        let fx = make_fixture();
        let result = fx.service.verify_access_token("no-such-token").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_verify_access_token_revoked() {
        let fx = make_fixture();
        let client = make_client();

        let (value, record) = fx
            .service
            .issue_access_token(None, &client, ScopeSet::parse("read"), None)
            .await
            .unwrap();
        fx.access_tokens.revoke(&record.token_hash).await.unwrap();

        assert!(fx.service.verify_access_token(&value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_access_token_expired() {
        let fx = make_fixture();
        let client = make_client();

        let (value, record) = fx
            .service
            .issue_access_token(None, &client, ScopeSet::parse("read"), None)
            .await
            .unwrap();

        // Backdate the expiry directly in the store
        {
            let mut tokens = fx.access_tokens.tokens.write().unwrap();
            let stored = tokens.get_mut(&record.token_hash).unwrap();
            stored.expires_at = OffsetDateTime::now_utc() - Duration::minutes(1);
        }

        assert!(fx.service.verify_access_token(&value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_forged_jwt_rejected() {
        let fx = make_fixture();
        // Signed by an unrelated key
        let other_key = SigningKeyPair::generate().unwrap();
        let other = JwtService::new(other_key, "https://auth.example.com");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let forged = other
            .encode(&AccessClaims {
                iss: "https://auth.example.com".to_string(),
                sub: "user-1".to_string(),
                exp: now + 3600,
                iat: now,
                jti: Uuid::new_v4().to_string(),
                scope: "openid".to_string(),
                client_id: "web-app".to_string(),
            })
            .unwrap();

        assert!(fx.service.verify_access_token(&forged).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signed_access_tokens_mode() {
        let config =
            TokenConfig::new("https://auth.example.com").with_signed_access_tokens(true);
        let fx = make_fixture_with(config);
        let client = make_client();

        let (value, record) = fx
            .service
            .issue_access_token(
                Some("user-1".to_string()),
                &client,
                ScopeSet::parse("openid"),
                None,
            )
            .await
            .unwrap();

        // The issued token is a JWT
        assert_eq!(value.matches('.').count(), 2);

        // Verification passes both the signature and the store check
        let claims = fx.service.verify_access_token(&value).await.unwrap().unwrap();
        assert_eq!(claims.jti, record.id.to_string());

        // Revocation still works through the digest index
        fx.access_tokens.revoke(&record.token_hash).await.unwrap();
        assert!(fx.service.verify_access_token(&value).await.unwrap().is_none());
    }

    // =========================================================================
    // Revocation & Introspection
    // =========================================================================

    #[tokio::test]
    async fn test_revoke_access_token() {
        let fx = make_fixture();
        let client = make_client();

        let (value, _) = fx
            .service
            .issue_access_token(None, &client, ScopeSet::parse("read"), None)
            .await
            .unwrap();

        fx.service
            .revoke(&RevocationRequest {
                token: value.clone(),
                token_type_hint: None,
            })
            .await
            .unwrap();

        assert!(fx.service.verify_access_token(&value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_refresh_token_without_hint() {
        let fx = make_fixture();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        // No hint: access store misses, falls through to refresh store
        fx.service
            .revoke(&RevocationRequest {
                token: value.clone(),
                token_type_hint: None,
            })
            .await
            .unwrap();

        let stored = fx
            .refresh_tokens
            .find_by_hash(&hash_token(&value))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_revoked());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let fx = make_fixture();

        // Unknown token: still success
        let request = RevocationRequest {
            token: "never-issued".to_string(),
            token_type_hint: Some(TokenTypeHint::AccessToken),
        };
        assert!(fx.service.revoke(&request).await.is_ok());
        // Twice in a row: still success
        assert!(fx.service.revoke(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_introspect_active_access_token() {
        let fx = make_fixture();
        let client = make_client();

        let (value, record) = fx
            .service
            .issue_access_token(
                Some("user-1".to_string()),
                &client,
                ScopeSet::parse("openid profile"),
                None,
            )
            .await
            .unwrap();

        let response = fx
            .service
            .introspect(&IntrospectionRequest {
                token: value,
                token_type_hint: None,
            })
            .await;

        assert!(response.active);
        assert_eq!(response.scope.as_deref(), Some("openid profile"));
        assert_eq!(response.client_id.as_deref(), Some("web-app"));
        assert_eq!(response.sub.as_deref(), Some("user-1"));
        assert_eq!(response.token_type.as_deref(), Some("Bearer"));
        assert_eq!(response.exp, Some(record.expires_at.unix_timestamp()));
    }

    #[tokio::test]
    async fn test_introspect_refresh_token_with_hint() {
        let fx = make_fixture();
        let value = seed_refresh_token(&fx, "web-app", "openid").await;

        let response = fx
            .service
            .introspect(&IntrospectionRequest {
                token: value,
                token_type_hint: Some(TokenTypeHint::RefreshToken),
            })
            .await;

        assert!(response.active);
        assert_eq!(response.sub.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_introspect_non_disclosure() {
        let fx = make_fixture();
        let client = make_client();

        // Revoked token
        let (revoked_value, revoked_record) = fx
            .service
            .issue_access_token(None, &client, ScopeSet::parse("read"), None)
            .await
            .unwrap();
        fx.access_tokens.revoke(&revoked_record.token_hash).await.unwrap();

        // Expired token
        let (expired_value, expired_record) = fx
            .service
            .issue_access_token(None, &client, ScopeSet::parse("read"), None)
            .await
            .unwrap();
        {
            let mut tokens = fx.access_tokens.tokens.write().unwrap();
            tokens.get_mut(&expired_record.token_hash).unwrap().expires_at =
                OffsetDateTime::now_utc() - Duration::minutes(1);
        }

        // Revoked, expired, and never-issued all introspect identically
        for token in [revoked_value, expired_value, "never-issued".to_string()] {
            let response = fx
                .service
                .introspect(&IntrospectionRequest {
                    token,
                    token_type_hint: None,
                })
                .await;
            let json = serde_json::to_string(&response).unwrap();
            assert_eq!(json, r#"{"active":false}"#);
        }
    }

    #[test]
    fn test_require_scopes() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            iss: "https://auth.example.com".to_string(),
            sub: "user-1".to_string(),
            exp: now + 3600,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            scope: "openid profile".to_string(),
            client_id: "web-app".to_string(),
        };

        assert!(require_scopes(&claims, &ScopeSet::parse("openid")).is_ok());
        assert!(require_scopes(&claims, &ScopeSet::parse("openid profile")).is_ok());
        assert!(require_scopes(&claims, &ScopeSet::new()).is_ok());

        let result = require_scopes(&claims, &ScopeSet::parse("openid email"));
        assert!(matches!(result, Err(AuthError::InvalidScope { .. })));
    }

    #[test]
    fn test_config_defaults() {
        let config = TokenConfig::new("https://auth.example.com");
        assert_eq!(config.access_token_lifetime, Duration::seconds(3600));
        assert_eq!(config.refresh_token_lifetime, Duration::seconds(2_592_000));
        assert!(!config.rotate_refresh_tokens);
        assert!(!config.signed_access_tokens);
    }

    #[test]
    fn test_config_builder() {
        let config = TokenConfig::new("https://auth.example.com")
            .with_access_token_lifetime(Duration::minutes(30))
            .with_refresh_token_lifetime(Duration::days(7))
            .with_rotate_refresh_tokens(true)
            .with_signed_access_tokens(true);

        assert_eq!(config.access_token_lifetime, Duration::minutes(30));
        assert_eq!(config.refresh_token_lifetime, Duration::days(7));
        assert!(config.rotate_refresh_tokens);
        assert!(config.signed_access_tokens);
    }
}
