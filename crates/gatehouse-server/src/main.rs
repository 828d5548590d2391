//! Gatehouse authorization server binary.
//!
//! Loads configuration, builds the in-memory backend, wires the router,
//! and serves until interrupted.

mod config;
mod router;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use gatehouse_auth::oauth::{AuthorizationConfig, AuthorizationService};
use gatehouse_auth::storage::{AccessTokenStore, CodeStore, RefreshTokenStore};
use gatehouse_auth::token::{JwtService, SigningKeyPair, TokenConfig, TokenService};
use gatehouse_auth::types::Client;
use gatehouse_auth_memory::{
    MemoryAccessTokenStore, MemoryClientStore, MemoryCodeStore, MemoryRefreshTokenStore,
    MemorySubjectStore,
};

use config::{ServerConfig, load_config, resolve_config_path};

/// Interval between expired-record sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    // .env is optional; only report unexpected failures
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: failed to load .env file: {e}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = resolve_config_path();
    let cfg = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(path = %config_path, issuer = %cfg.auth.issuer, "Configuration loaded");

    let signing_key = match build_signing_key(&cfg) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Signing key error: {e}");
            std::process::exit(2);
        }
    };
    let jwt = Arc::new(JwtService::new(signing_key, cfg.auth.issuer.clone()));

    // In-memory backend; durable deployments swap in a relational one
    // behind the same traits.
    let clients = Arc::new(MemoryClientStore::new());
    let codes = Arc::new(MemoryCodeStore::new());
    let access_tokens = Arc::new(MemoryAccessTokenStore::new());
    let refresh_tokens = Arc::new(MemoryRefreshTokenStore::new());
    let subjects = Arc::new(MemorySubjectStore::new());

    for client in &cfg.clients {
        // Config files carry plaintext secrets; only digests are stored.
        let mut client = client.clone();
        client.client_secret = client.client_secret.map(|s| Client::hash_secret(&s));

        if let Err(e) = clients.register(client.clone()) {
            tracing::warn!(client_id = %client.client_id, error = %e, "Skipping invalid client registration");
        } else {
            tracing::info!(client_id = %client.client_id, "Client registered");
        }
    }

    let authorization_service = Arc::new(AuthorizationService::new(
        clients.clone(),
        codes.clone(),
        AuthorizationConfig::default().with_code_lifetime(to_time_duration(
            cfg.auth.oauth.authorization_code_lifetime,
        )),
    ));

    let token_config = TokenConfig::new(cfg.auth.issuer.clone())
        .with_access_token_lifetime(to_time_duration(cfg.auth.oauth.access_token_lifetime))
        .with_refresh_token_lifetime(to_time_duration(cfg.auth.oauth.refresh_token_lifetime))
        .with_rotate_refresh_tokens(cfg.auth.oauth.refresh_token_rotation)
        .with_signed_access_tokens(cfg.auth.oauth.signed_access_tokens);
    let token_service = Arc::new(TokenService::new(
        jwt.clone(),
        codes.clone(),
        access_tokens.clone(),
        refresh_tokens.clone(),
        token_config,
    ));

    spawn_cleanup_task(codes.clone(), access_tokens.clone(), refresh_tokens.clone());

    let app = router::build_router(
        authorization_service,
        token_service,
        clients,
        subjects,
        jwt,
        cfg.auth.clone(),
    );

    let addr = cfg.bind.addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(%addr, "Gatehouse listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Loads the signing key from PEM files, or generates one.
///
/// Generated keys do not survive restarts; outstanding signed tokens
/// become unverifiable when the process restarts without configured keys.
fn build_signing_key(cfg: &ServerConfig) -> Result<SigningKeyPair, String> {
    let signing = &cfg.auth.signing;
    match (&signing.private_key_path, &signing.public_key_path) {
        (Some(private_path), Some(public_path)) => {
            let private_pem =
                std::fs::read_to_string(private_path).map_err(|e| format!("{private_path}: {e}"))?;
            let public_pem =
                std::fs::read_to_string(public_path).map_err(|e| format!("{public_path}: {e}"))?;
            let kid = signing.key_id.clone().unwrap_or_else(|| "default".to_string());
            SigningKeyPair::from_pem(kid, &private_pem, &public_pem).map_err(|e| e.to_string())
        }
        (None, None) => {
            tracing::warn!("No signing key configured; generating an ephemeral key pair");
            SigningKeyPair::generate().map_err(|e| e.to_string())
        }
        _ => Err("Both private_key_path and public_key_path must be set together".to_string()),
    }
}

/// Periodically sweeps expired codes and tokens out of the stores.
fn spawn_cleanup_task(
    codes: Arc<MemoryCodeStore>,
    access_tokens: Arc<MemoryAccessTokenStore>,
    refresh_tokens: Arc<MemoryRefreshTokenStore>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            let removed_codes = codes.cleanup_expired().await.unwrap_or(0);
            let removed_access = access_tokens.cleanup_expired().await.unwrap_or(0);
            let removed_refresh = refresh_tokens.cleanup_expired().await.unwrap_or(0);
            if removed_codes + removed_access + removed_refresh > 0 {
                tracing::debug!(
                    codes = removed_codes,
                    access_tokens = removed_access,
                    refresh_tokens = removed_refresh,
                    "Expired records swept"
                );
            }
        }
    });
}

fn to_time_duration(duration: Duration) -> time::Duration {
    time::Duration::seconds(duration.as_secs() as i64)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
