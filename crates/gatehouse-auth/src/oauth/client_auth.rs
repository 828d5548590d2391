//! Client authentication for the token-style endpoints.
//!
//! The token, revocation, and introspection endpoints all authenticate the
//! calling client the same way. Methods are tried in priority order:
//!
//! 1. HTTP Basic Auth header (`client_secret_basic`)
//! 2. `client_id` + `client_secret` in the body (`client_secret_post`)
//! 3. `client_id` alone (public clients, `none`)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::token::TokenRequest;
use crate::storage::ClientStore;
use crate::types::Client;

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Token endpoint authentication methods (OpenID Connect Core Section 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in the request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authenticates a client from a token-style request.
///
/// # Errors
///
/// Returns `invalid_client` if no credentials were provided, the client is
/// unknown or inactive, the secret is wrong, or the client used an
/// authentication method its registration does not permit.
pub async fn authenticate_client(
    request: &TokenRequest,
    basic_auth: Option<(&str, &str)>,
    clients: &dyn ClientStore,
) -> AuthResult<AuthenticatedClient> {
    // 1. HTTP Basic Auth takes priority for confidential clients
    if let Some((client_id, client_secret)) = basic_auth {
        return authenticate_with_secret(
            client_id,
            client_secret,
            TokenEndpointAuthMethod::ClientSecretBasic,
            clients,
        )
        .await;
    }

    // 2. client_secret_post
    if let (Some(client_id), Some(client_secret)) = (&request.client_id, &request.client_secret) {
        return authenticate_with_secret(
            client_id,
            client_secret,
            TokenEndpointAuthMethod::ClientSecretPost,
            clients,
        )
        .await;
    }

    // 3. Public client (client_id only)
    if let Some(client_id) = &request.client_id {
        return authenticate_public(client_id, clients).await;
    }

    Err(AuthError::invalid_client("No client credentials provided"))
}

/// Authenticates a confidential client with a presented secret.
async fn authenticate_with_secret(
    client_id: &str,
    client_secret: &str,
    auth_method: TokenEndpointAuthMethod,
    clients: &dyn ClientStore,
) -> AuthResult<AuthenticatedClient> {
    let client = lookup_active_client(client_id, clients).await?;

    if !client.confidential {
        return Err(AuthError::invalid_client(format!(
            "Public clients cannot use {auth_method} authentication"
        )));
    }

    if !clients.verify_secret(client_id, client_secret).await? {
        return Err(AuthError::invalid_client("Invalid client secret"));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method,
    })
}

/// Authenticates a public client (no secret required).
async fn authenticate_public(
    client_id: &str,
    clients: &dyn ClientStore,
) -> AuthResult<AuthenticatedClient> {
    let client = lookup_active_client(client_id, clients).await?;

    if client.confidential {
        return Err(AuthError::invalid_client(
            "Confidential clients must provide client credentials",
        ));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: TokenEndpointAuthMethod::None,
    })
}

async fn lookup_active_client(client_id: &str, clients: &dyn ClientStore) -> AuthResult<Client> {
    let client = clients
        .find_by_client_id(client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    if !client.active {
        return Err(AuthError::invalid_client("Client is inactive"));
    }

    Ok(client)
}

/// Parses an HTTP Basic Auth header value into `(client_id, client_secret)`.
///
/// Returns `None` when the header is not well-formed Basic auth.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = credentials.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GrantType;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct MockClientStore {
        clients: RwLock<HashMap<String, Client>>,
    }

    impl MockClientStore {
        fn new() -> Self {
            Self {
                clients: RwLock::new(HashMap::new()),
            }
        }

        fn add(&self, client: Client) {
            self.clients
                .write()
                .unwrap()
                .insert(client.client_id.clone(), client);
        }
    }

    #[async_trait::async_trait]
    impl ClientStore for MockClientStore {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self.clients.read().unwrap().get(client_id).cloned())
        }

        async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
            Ok(self
                .clients
                .read()
                .unwrap()
                .get(client_id)
                .map(|c| c.verify_secret(secret))
                .unwrap_or(false))
        }
    }

    fn public_client() -> Client {
        Client {
            client_id: "web-app".to_string(),
            client_secret: None,
            name: "Web App".to_string(),
            grant_types: vec![GrantType::AuthorizationCode],
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

    fn confidential_client() -> Client {
        Client {
            client_id: "backend".to_string(),
            client_secret: Some(Client::hash_secret("s3cret")),
            name: "Backend".to_string(),
            grant_types: vec![GrantType::ClientCredentials],
            response_types: vec![],
            redirect_uris: vec![],
            scopes: vec![],
            confidential: true,
            active: true,
            pkce_required: None,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        }
    }

    #[test]
    fn test_parse_basic_auth() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode("backend:s3cret");
        let parsed = parse_basic_auth(&format!("Basic {encoded}"));
        assert_eq!(parsed, Some(("backend".to_string(), "s3cret".to_string())));

        assert!(parse_basic_auth("Bearer abc").is_none());
        assert!(parse_basic_auth("Basic not-base64!!!").is_none());
    }

    #[tokio::test]
    async fn test_authenticate_basic() {
        let store = MockClientStore::new();
        store.add(confidential_client());

        let request = TokenRequest::for_client_auth(None, None);
        let result = authenticate_client(&request, Some(("backend", "s3cret")), &store)
            .await
            .unwrap();
        assert_eq!(result.client.client_id, "backend");
        assert_eq!(
            result.auth_method,
            TokenEndpointAuthMethod::ClientSecretBasic
        );
    }

    #[tokio::test]
    async fn test_authenticate_basic_wrong_secret() {
        let store = MockClientStore::new();
        store.add(confidential_client());

        let request = TokenRequest::for_client_auth(None, None);
        let result = authenticate_client(&request, Some(("backend", "wrong")), &store).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_secret_post() {
        let store = MockClientStore::new();
        store.add(confidential_client());

        let request = TokenRequest::for_client_auth(
            Some("backend".to_string()),
            Some("s3cret".to_string()),
        );
        let result = authenticate_client(&request, None, &store).await.unwrap();
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::ClientSecretPost);
    }

    #[tokio::test]
    async fn test_authenticate_public() {
        let store = MockClientStore::new();
        store.add(public_client());

        let request = TokenRequest::for_client_auth(Some("web-app".to_string()), None);
        let result = authenticate_client(&request, None, &store).await.unwrap();
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::None);
    }

    #[tokio::test]
    async fn test_confidential_client_requires_credentials() {
        let store = MockClientStore::new();
        store.add(confidential_client());

        let request = TokenRequest::for_client_auth(Some("backend".to_string()), None);
        let result = authenticate_client(&request, None, &store).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_public_client_cannot_use_secret() {
        let store = MockClientStore::new();
        store.add(public_client());

        let request = TokenRequest::for_client_auth(
            Some("web-app".to_string()),
            Some("whatever".to_string()),
        );
        let result = authenticate_client(&request, None, &store).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let store = MockClientStore::new();
        let request = TokenRequest::for_client_auth(Some("ghost".to_string()), None);
        let result = authenticate_client(&request, None, &store).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_inactive_client() {
        let store = MockClientStore::new();
        let mut client = public_client();
        client.active = false;
        store.add(client);

        let request = TokenRequest::for_client_auth(Some("web-app".to_string()), None);
        let result = authenticate_client(&request, None, &store).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let store = MockClientStore::new();
        let request = TokenRequest::for_client_auth(None, None);
        let result = authenticate_client(&request, None, &store).await;
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }
}
