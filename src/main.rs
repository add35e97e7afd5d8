#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use url::Url;
use uuid::Uuid;

use crate::api::AuthConfig;
use crate::api::router;
use crate::storage::Storage;
use crate::storage::setup;
use crate::utils::env_var_or_else;

mod api;
mod feedback;
mod form;
mod graceful_shutdown;
mod insights;
mod sessions;
mod storage;
mod templates;
#[cfg(all(test, not(feature = "postgres")))]
mod tests;
mod users;
mod utils;
mod validation;

const DEFAULT_RUST_LOG: &str = "feedbase=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = setup_app().await?;

    let address = setup_address()?;
    tracing::info!("Listening on {}", address);

    let listener = TcpListener::bind(address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Database connection
/// - Identity provider configuration
pub async fn setup_app() -> Result<Router> {
    let storage = setup().await;
    let auth_config = setup_auth_config()?;

    Ok(create_router(storage, auth_config))
}

/// Create the router for Feedbase
fn create_router<S: Storage>(storage: S, auth_config: AuthConfig) -> Router {
    Router::new()
        .nest("/api", router::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(auth_config))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_auth_config() -> Result<AuthConfig> {
    let authorize_url = env_var_or_else("OIDC_AUTHORIZE_URL", || {
        String::from("https://auth.example.com/authorize")
    });
    let authorize_url = Url::parse(&authorize_url)?;

    let client_id = env_var_or_else("OIDC_CLIENT_ID", || String::from("feedbase"));

    let redirect_uri = env_var_or_else("OIDC_REDIRECT_URI", || {
        String::from("http://localhost:6000/api/callback")
    });

    let client_secret = env_var_or_else("OIDC_CLIENT_SECRET", || {
        let client_secret = Uuid::new_v4().to_string();
        tracing::info!("`OIDC_CLIENT_SECRET` is not set, generating temporary one: {client_secret}");
        client_secret
    });

    Ok(AuthConfig::new(
        authorize_url,
        client_id,
        redirect_uri,
        client_secret.as_bytes(),
    ))
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Ok(port) = std::env::var("PORT") {
        // only check non-empty strings
        if !port.is_empty() {
            let port = port.parse::<u16>()?;

            address.set_port(port);
        }
    }

    Ok(address)
}
