use std::{collections::HashMap, num::ParseIntError};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_derive::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
    arithmetic_handler::ArithmeticRequest,
    db::AccessToken,
    errors::{AppError, HttpError},
    router::AppState,
    service_provider::slack::{swap_slack_access_token, Slack},
};

#[derive(Deserialize, Debug, Default)]
pub struct InstallParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Deep link opening the app's about tab in the Slack client.
pub fn app_deep_link(team_id: &str, app_id: &str) -> String {
    format!("slack://app?team={}&id={}&tab=about", team_id, app_id)
}

pub async fn handle_installation(State(state): State<AppState>, Query(params): Query<InstallParams>) -> Result<Response, HttpError> {
    if let Some(error) = params.error {
        info!("Installation declined: {}", error);
        return Ok((StatusCode::OK, "error installing app").into_response());
    }

    let code = params.code
        .ok_or_else(|| HttpError::bad_request("missing mandatory 'code' query parameter"))?;

    let oauth_response = swap_slack_access_token(
        &state.http_client,
        &state.config.slack_api_url,
        &code,
        &state.config.client_id,
        &state.config.client_secret,
    )
    .await
    .map_err(|err| HttpError::internal(format!("error exchanging temporary code for access token: {}", err)))?;

    let access_token = AccessToken::new(oauth_response.team.id, oauth_response.access_token);
    state.token_store
        .put(&access_token)
        .map_err(|err| HttpError::internal(format!("error storing slack access token: {}", err)))?;

    info!(
        "Installed app {} to workspace {} ({:?}), scope: {:?}",
        oauth_response.app_id, access_token.workspace_id, oauth_response.team.name, oauth_response.scope
    );

    let location = app_deep_link(&access_token.workspace_id, &oauth_response.app_id);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// The fields of a slash command payload this app reads.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashCommand {
    pub team_id: String,
    pub user_id: String,
    pub command: String,
    pub text: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum SlashCommandError {
    #[error("missing {0}")]
    MissingField(&'static str),
}

impl SlashCommand {
    pub fn parse(body: &[u8]) -> Result<SlashCommand, SlashCommandError> {
        let mut params: HashMap<String, String> = form_urlencoded::parse(body).into_owned().collect();
        let mut required = |name: &'static str| {
            params.remove(name).filter(|v| !v.is_empty()).ok_or(SlashCommandError::MissingField(name))
        };

        let team_id = required("team_id")?;
        let user_id = required("user_id")?;

        Ok(SlashCommand {
            team_id,
            user_id,
            command: params.remove("command").unwrap_or_default(),
            text: params.remove("text").unwrap_or_default(),
        })
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PlusArgsError {
    #[error("invalid number of input parameters provided")]
    Count,

    #[error("invalid 1st input parameter: {0}")]
    First(ParseIntError),

    #[error("invalid 2nd input parameter: {0}")]
    Second(ParseIntError),
}

/// Reads exactly two whitespace separated integers.
pub fn parse_plus_args(text: &str) -> Result<ArithmeticRequest, PlusArgsError> {
    let args: Vec<&str> = text.split_whitespace().collect();
    let [num1, num2] = args.as_slice() else {
        return Err(PlusArgsError::Count);
    };

    Ok(ArithmeticRequest {
        num1: num1.parse().map_err(PlusArgsError::First)?,
        num2: num2.parse().map_err(PlusArgsError::Second)?,
    })
}

pub async fn handle_plus(State(state): State<AppState>, body: Bytes) -> Result<Response, HttpError> {
    let command = SlashCommand::parse(&body)
        .map_err(|err| HttpError::bad_request(format!("invalid slash command payload: {}", err)))?;

    let request = parse_plus_args(&command.text)
        .map_err(|err| HttpError::bad_request(err.to_string()))?;

    let output = state.arithmetic
        .add(&request)
        .await
        .map_err(|err| HttpError::internal(err.to_string()))?;

    let token = state.token_store
        .get(&command.team_id)
        // An absent token fails here rather than at send time.
        .and_then(|token| token.ok_or_else(|| AppError::TokenNotFound(command.team_id.clone())))
        .map_err(|err| HttpError::internal(format!("error reading slack access token: {}", err)))?;

    Slack::new(state.http_client.clone(), &state.config.slack_api_url, token)
        .send_message(&command.user_id, &format!("Sum is {}", output.sum))
        .await
        .map_err(|err| HttpError::internal(format!("error sending slack message: {}", err)))?;

    info!("Answered {} {:?} for user {} in workspace {}", command.command, command.text, command.user_id, command.team_id);
    Ok(StatusCode::OK.into_response())
}
