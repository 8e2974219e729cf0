//! paylink-gateway server entry point.
//!
//! Starts the Axum HTTP server with the participant, organizer and webhook
//! endpoints.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use paylink_gateway::api;
use paylink_gateway::app_state::AppState;
use paylink_gateway::config::{GatewayConfig, LogFormat};
use paylink_gateway::notify::{LogMailer, Mailer, RelayMailer};
use paylink_gateway::persistence::{InMemoryStore, PaymentStore, PostgresStore};
use paylink_gateway::provider::{PayPayClient, PaymentProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("invalid LISTEN_ADDR")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting paylink-gateway");

    // Datastore
    let store: Arc<dyn PaymentStore> = if config.persistence_enabled {
        Arc::new(
            PostgresStore::connect(&config)
                .await
                .context("connecting to PostgreSQL")?,
        )
    } else {
        tracing::warn!("persistence disabled; using the in-memory datastore");
        Arc::new(InMemoryStore::new())
    };

    // Collaborators
    let provider: Arc<dyn PaymentProvider> = Arc::new(
        PayPayClient::new(
            config.paypay_base_url(),
            config.provider_redirect_url(),
            config.provider_timeout(),
        )
        .context("building provider client")?,
    );
    let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
        Some(url) => Arc::new(
            RelayMailer::new(
                url.as_str(),
                config.mail_relay_token.clone(),
                config.provider_timeout(),
            )
            .context("building mail relay client")?,
        ),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; outgoing mail is logged only");
            Arc::new(LogMailer)
        }
    };

    let app_state = AppState::new(
        store,
        provider,
        mailer,
        config.app_url.clone(),
        config.auth_token_ttl(),
    );

    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; waiting for Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
}
