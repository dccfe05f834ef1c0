use std::{path::PathBuf, time::Duration};

use clap::Args;

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_ARITHMETIC_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Host to bind to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on; each binary supplies its own default.
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,
}

impl ServerArgs {
    pub fn bind_address(&self, default_port: u16) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(default_port))
    }
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

#[derive(Clone, Args)]
pub struct SlackConfig {
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: String,

    #[arg(long, env = "CLIENT_SECRET")]
    pub client_secret: String,

    /// Signing secret used to verify inbound webhooks.
    #[arg(long, env = "SIGNATURE_SECRET")]
    pub signing_secret: String,

    #[arg(long, env = "SLACK_API_URL", default_value = DEFAULT_SLACK_API_URL)]
    pub slack_api_url: String,

    /// Base URL of the arithmetic service.
    #[arg(long, env = "ARITHMETIC_URL", default_value = DEFAULT_ARITHMETIC_URL)]
    pub arithmetic_url: String,

    #[arg(long, env = "TOKEN_DB_PATH", default_value = "slack.db")]
    pub db_path: PathBuf,

    /// Base64 encoded 32 byte key; tokens are stored in plain text without it.
    #[arg(long, env = "TOKEN_ENCRYPTION_KEY")]
    pub encryption_key: Option<String>,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,
}

impl SlackConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

// Hand-written so secrets never reach the logs.
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("client_id", &self.client_id)
            .field("slack_api_url", &self.slack_api_url)
            .field("arithmetic_url", &self.arithmetic_url)
            .field("db_path", &self.db_path)
            .field("encrypted_tokens", &self.encryption_key.is_some())
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish_non_exhaustive()
    }
}
