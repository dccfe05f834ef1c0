use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{any, post},
    Router,
};
use reqwest::Client;

use crate::{
    config::SlackConfig,
    db::TokenStore,
    service_provider::arithmetic::Arithmetic,
    signature::{require_slack_signature, SignatureVerifier},
    slack_events::handle_event,
    slack_handler::{handle_installation, handle_plus},
};

/// Everything the Slack handlers share. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SlackConfig>,
    pub http_client: Client,
    pub token_store: Arc<dyn TokenStore>,
    pub arithmetic: Arithmetic,
}

impl AppState {
    pub fn new(config: SlackConfig, http_client: Client, token_store: Arc<dyn TokenStore>) -> AppState {
        let arithmetic = Arithmetic::new(http_client.clone(), &config.arithmetic_url);

        AppState { config: Arc::new(config), http_client, token_store, arithmetic }
    }
}

/// Routes of the integration service. `/cmd` and `/event` only run for signed requests.
pub fn slack_router(state: AppState) -> Router {
    let verifier = SignatureVerifier::new(&state.config.signing_secret);

    let commands = Router::new()
        .route("/plus", post(handle_plus))
        .route_layer(from_fn_with_state(verifier.clone(), require_slack_signature));

    let events = Router::new()
        .route("/handle", post(handle_event))
        .route_layer(from_fn_with_state(verifier, require_slack_signature));

    Router::new()
        .route("/install", any(handle_installation))
        .nest("/cmd", commands)
        .nest("/event", events)
        .with_state(state)
}
