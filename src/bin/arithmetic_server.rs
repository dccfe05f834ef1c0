use clap::Parser;
use slack_plus::{arithmetic_handler::arithmetic_router, config::{LogArgs, ServerArgs}, errors::AppError, logging, server::serve};

const DEFAULT_PORT: u16 = 8080;

/// Adds two integers sent as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct App {
    #[command(flatten)]
    server: ServerArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let app = App::parse();
    logging::init("info", app.log.log_json);

    serve(&app.server.bind_address(DEFAULT_PORT), arithmetic_router()).await
}
