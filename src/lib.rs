pub mod config;
pub mod context;
pub mod error;
pub mod google;
pub mod line;
pub mod queue;
pub mod relay;
pub mod server;
pub mod storage;
pub mod types;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use log::{debug, error, info};
use tokio::net::TcpListener;

use config::Config;
use context::ContextStore;
use error::Result;
use google::GoogleClient;
use line::LineClient;
use relay::{Dispatcher, Relay};
use server::AppState;
use storage::S3ImageStore;

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the webhook server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the listener cannot be bound.
pub async fn run() -> Result<()> {
    info!("Initializing relay");
    let config = Config::from_env()?;

    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

    debug!("Initializing provider clients");
    let relay = Arc::new(Relay::new(
        Arc::new(ContextStore::new(config.context_ttl)),
        GoogleClient::new(&config.google, http.clone()),
        S3ImageStore::from_config(&config.s3).await,
        LineClient::new(config.line.channel_access_token.clone(), http),
    ));
    let sweeper = tokio::spawn(sweep_contexts(Arc::clone(relay.contexts())));
    let dispatcher = Arc::new(Dispatcher::new(
        relay,
        config.generation_concurrency,
        config.context_ttl,
    ));

    let app = server::router(AppState {
        channel_secret: Arc::from(config.line.channel_secret.as_str()),
        dispatcher,
    });

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port))).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}

async fn sweep_contexts(contexts: Arc<ContextStore>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let removed = contexts.sweep().await;
        if removed > 0 {
            debug!("Periodic sweep removed {removed} image contexts");
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, shutting down..."),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}
