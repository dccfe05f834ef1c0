pub mod arithmetic_handler;
pub mod base64;
pub mod config;
pub mod db;
pub mod encryption;
pub mod errors;
mod http_client;
pub mod logging;
pub mod router;
pub mod server;
pub mod service_provider;
pub mod signature;
pub mod slack_events;
pub mod slack_handler;

#[cfg(test)]
mod slack_handler_test;

pub use http_client::build_http_client;
