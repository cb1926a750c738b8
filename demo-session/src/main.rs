use std::{net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use oidc_session::{AuthorizedClient, HttpOidcProvider, OidcSettings, RouteGuard, SessionCoordinator};

mod handlers;

use crate::handlers::{AppState, index, login, logout, products, protected, signin_callback};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,oidc_session=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = OidcSettings::from_env()?;
    let port = settings.redirect_uri.port_or_known_default().unwrap_or(3000);

    let provider = Arc::new(HttpOidcProvider::new(settings)?);
    let coordinator = Arc::new(SessionCoordinator::new(provider));
    coordinator.initialize().await?;

    let api_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:4000/".to_string());
    let api = AuthorizedClient::new(Url::parse(&api_url)?, coordinator.subscribe());

    let state = AppState {
        coordinator: coordinator.clone(),
        guard: RouteGuard::new("/"),
        api,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/logout", get(logout))
        .route("/signin-callback.html", get(signin_callback))
        .route("/silent-renew.html", get(signin_callback))
        .route("/protected", get(protected))
        .route("/products", get(products))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;

    coordinator.shutdown().await;
    Ok(())
}
