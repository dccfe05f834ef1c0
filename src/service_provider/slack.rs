use reqwest::{Client, Method};
use serde_derive::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{errors::AppError, base64::encode_with_pad};

#[derive(Deserialize, Debug)]
struct SlackResponse<T> {
    ok: bool,
    error: Option<String>,

    #[serde(flatten)]
    data: Option<T>,
}

impl<T> SlackResponse<T> {
    fn into_result(self) -> Result<T, AppError> {
        match (self.ok, self.error, self.data) {
            (true, _, Some(data)) => Ok(data),
            (true, _, None) => Err(AppError::SlackError("unexpected response payload".to_string())),
            (false, Some(error), _) => Err(AppError::SlackError(error)),
            (false, None, _) => Err(AppError::SlackError("Unknown error".to_string())),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PostMessageResponse {
    pub channel: Option<String>,
    pub ts: Option<String>,
}

/// Slack Web API client acting with one workspace's access token.
pub struct Slack {
    http_client: Client,
    api_url: String,
    api_token: String,
}

impl Slack {
    pub fn new(http_client: Client, api_url: &str, api_token: String) -> Slack {
        Slack { http_client, api_url: api_url.trim_end_matches('/').to_string(), api_token }
    }

    pub async fn send_message(&self, channel_id: &str, message: &str) -> Result<PostMessageResponse, AppError> {
        let payload = json!({
            "channel": channel_id,
            "text": message,
        });

        self.send_request("chat.postMessage", Method::POST, &payload).await
    }

    async fn send_request<T>(&self, endpoint: &str, method: Method, payload: &Value) -> Result<T, AppError>
    where
        T: for<'a> serde::Deserialize<'a>,
    {
        let url = format!("{}/{}", self.api_url, endpoint);
        debug!("Slack: {} {}", method.as_str(), endpoint);

        let response = self.http_client.request(method, url)
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Failed sending request to Slack {}, status: {}", endpoint, response.status());
            return Err(AppError::SlackError(format!("Failed sending request to Slack, status: {}", response.status())));
        }

        let json_response: SlackResponse<T> = response.json().await?;
        json_response.into_result()
    }
}

#[derive(Deserialize, Debug)]
pub struct SlackTeam {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SlackOauthResponse {
    pub app_id: String,
    pub access_token: String,
    pub team: SlackTeam,
    pub scope: Option<String>,
}

/// Exchanges a temporary OAuth code for the workspace's access token.
pub async fn swap_slack_access_token(http_client: &Client, api_url: &str, temp_code: &str, slack_client_id: &str, slack_client_secret: &str) -> Result<SlackOauthResponse, AppError> {
    let url = format!("{}/oauth.v2.access", api_url.trim_end_matches('/'));
    let credentials = encode_with_pad(format!("{}:{}", slack_client_id, slack_client_secret).as_bytes());

    let response = http_client
        .request(Method::POST, url)
        .header("Authorization", format!("Basic {}", credentials))
        .query(&[("code", temp_code)])
        .send()
        .await?;

    if !response.status().is_success() {
        warn!("Failed exchanging slack oauth code, status: {}", response.status());
        return Err(AppError::SlackError(format!("Failed sending request to Slack, status: {}", response.status())));
    }

    let response_body = response.text().await?;
    let json_response: SlackResponse<SlackOauthResponse> = serde_json::from_str(&response_body)
        .map_err(|err| AppError::SlackError(err.to_string()))?;

    json_response.into_result()
}
