use anyhow::{Context, Result};
use axum::extract::FromRef;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    blassa_api::{BlassaClient, RideSearchApi},
    config::Settings,
    notifications::{NotificationCenter, NotificationCounter},
    recent_searches::RecentSearches,
    search_session::SearchSession,
    token_manager::TokenManager,
};

// Declare modules
mod auth_middleware;
mod blassa_api;
mod config;
mod error;
mod filters;
mod models;
mod notifications;
mod recent_searches;
mod routes;
mod search_session;
mod token_manager;

// Services shared by every handler. Each one is built here and nowhere else.
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    api: BlassaClient,
    search: Arc<SearchSession>,
    recent_searches: Arc<RecentSearches>,
    tokens: Arc<TokenManager>,
    notifications: Arc<NotificationCenter>,
}

impl AppState {
    async fn build(settings: Settings) -> Result<Self> {
        let api = BlassaClient::new(&settings)?;
        let search_api: Arc<dyn RideSearchApi> = Arc::new(api.clone());
        Self::assemble(settings, api, search_api).await
    }

    async fn assemble(settings: Settings, api: BlassaClient, search_api: Arc<dyn RideSearchApi>) -> Result<Self> {
        let recent_searches = RecentSearches::load(&settings.data_dir)
            .await
            .context("Failed to load recent searches")?;
        let tokens = TokenManager::load(&settings.data_dir)
            .await
            .context("Failed to load stored credentials")?;
        let notifications = NotificationCenter::new(api.clone(), Arc::new(NotificationCounter::default()));

        Ok(Self {
            search: Arc::new(SearchSession::new(search_api, &settings)),
            recent_searches: Arc::new(recent_searches),
            tokens: Arc::new(tokens),
            notifications: Arc::new(notifications),
            settings: Arc::new(settings),
            api,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "blassa_gateway=info,tower_http=info".into()))
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing Blassa gateway...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    let addr = settings.socket_addr()?;
    tracing::info!(api_base_url = %settings.api_base_url, data_dir = %settings.data_dir.display(), "Using backend");

    let app_state = AppState::build(settings).await?;
    if app_state.tokens.is_logged_in().await {
        tracing::info!("Restored signed-in session for {:?}", app_state.tokens.user_email().await);
    }
    tracing::debug!(page_size = app_state.settings.page_size, "Search session ready");

    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
