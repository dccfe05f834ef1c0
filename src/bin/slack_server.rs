use std::sync::Arc;

use clap::Parser;
use slack_plus::{
    build_http_client,
    config::{LogArgs, ServerArgs, SlackConfig},
    db::SqliteTokenStore,
    encryption::Encryption,
    errors::AppError,
    logging,
    router::{slack_router, AppState},
    server::serve,
};
use tracing::{error, info};

const DEFAULT_PORT: u16 = 3000;

/// Bridges Slack slash commands and events to the arithmetic service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct App {
    #[command(flatten)]
    server: ServerArgs,

    #[command(flatten)]
    slack: SlackConfig,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let app = App::parse();
    logging::init("info", app.log.log_json);

    match run(app).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("Slack server failed: {}", err);
            Err(err)
        }
    }
}

async fn run(app: App) -> Result<(), AppError> {
    info!("Starting with {:?}", app.slack);

    let encryption = app.slack.encryption_key.as_deref().map(Encryption::with).transpose()?;
    let token_store = SqliteTokenStore::open(&app.slack.db_path, encryption)?;
    let http_client = build_http_client(app.slack.http_timeout())?;

    let state = AppState::new(app.slack, http_client, Arc::new(token_store));
    serve(&app.server.bind_address(DEFAULT_PORT), slack_router(state)).await
}
