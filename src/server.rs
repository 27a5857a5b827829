//! HTTP surface: health check and the LINE webhook callback.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use log::{debug, error, info, warn};

use crate::line::{SIGNATURE_HEADER, parse_payload, verify_signature};
use crate::relay::EventDispatch;

pub const HEALTH_MESSAGE: &str = "LINE Bot is running! 🤖✨";

/// Shared state for the webhook handlers.
pub struct AppState<D> {
    pub channel_secret: Arc<str>,
    pub dispatcher: Arc<D>,
}

impl<D> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            channel_secret: Arc::clone(&self.channel_secret),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

/// Build the application router.
pub fn router<D: EventDispatch>(state: AppState<D>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/callback", post(callback::<D>))
        .with_state(state)
}

async fn health_check() -> &'static str {
    HEALTH_MESSAGE
}

async fn callback<D: EventDispatch>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        warn!("Webhook request without signature");
        return (StatusCode::BAD_REQUEST, "Missing signature");
    };

    debug!("Request body: {}", String::from_utf8_lossy(&body));

    if !verify_signature(&state.channel_secret, &body, signature) {
        error!("Invalid signature. Check your channel secret.");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to parse webhook body: {e}");
            return (StatusCode::BAD_REQUEST, "Invalid payload");
        }
    };

    info!(
        "Webhook for {} with {} events",
        payload.destination,
        payload.events.len()
    );
    for event in payload.events {
        state.dispatcher.dispatch(event).await;
    }

    (StatusCode::OK, "OK")
}
