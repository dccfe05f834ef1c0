//! Slack Events API envelopes and their handler.
//!
//! The envelope `type` decides the variant; callback envelopes carry an inner event
//! with its own `type`. Parsing is done in two passes so a malformed known variant and
//! an unknown variant produce different errors.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::{errors::HttpError, router::AppState};

#[derive(Debug, Clone, PartialEq)]
pub enum EventsApiEvent {
    UrlVerification(UrlVerificationEvent),
    AppRateLimited(AppRateLimitedEvent),
    Callback(CallbackEvent),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UrlVerificationEvent {
    pub challenge: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AppRateLimitedEvent {
    pub team_id: Option<String>,
    pub minute_rate_limited: Option<i64>,
    pub api_app_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    pub team_id: String,
    pub event_id: Option<String>,
    pub event: InnerEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InnerEvent {
    AppUninstalled,
    /// Any inner event type this app has no handler for.
    Unhandled(String),
}

#[derive(Serialize, Debug)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Error, Debug)]
pub enum EventParseError {
    #[error("invalid slack event payload: {0}")]
    Envelope(serde_json::Error),

    #[error("invalid url verification event payload sent from slack: {0}")]
    UrlVerification(serde_json::Error),

    #[error("invalid callback event payload sent from slack: {0}")]
    Callback(serde_json::Error),

    #[error("invalid inner event payload sent from slack: {0}")]
    InnerEvent(serde_json::Error),

    #[error("invalid event type sent from slack: {0}")]
    UnknownType(String),
}

#[derive(Deserialize)]
struct TypeTag {
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Deserialize)]
struct RawCallbackEvent {
    team_id: String,
    event_id: Option<String>,
    event: Value,
}

pub fn parse_event(body: &[u8]) -> Result<EventsApiEvent, EventParseError> {
    let tag: TypeTag = serde_json::from_slice(body).map_err(EventParseError::Envelope)?;

    match tag.event_type.as_str() {
        "url_verification" => serde_json::from_slice(body)
            .map(EventsApiEvent::UrlVerification)
            .map_err(EventParseError::UrlVerification),
        // Only acknowledged, so a notice with unexpected fields is still accepted.
        "app_rate_limited" => Ok(EventsApiEvent::AppRateLimited(
            serde_json::from_slice(body).unwrap_or_default(),
        )),
        "event_callback" => {
            let raw: RawCallbackEvent = serde_json::from_slice(body).map_err(EventParseError::Callback)?;
            let inner: TypeTag = serde_json::from_value(raw.event).map_err(EventParseError::InnerEvent)?;

            let event = match inner.event_type.as_str() {
                "app_uninstalled" => InnerEvent::AppUninstalled,
                _ => InnerEvent::Unhandled(inner.event_type),
            };

            Ok(EventsApiEvent::Callback(CallbackEvent { team_id: raw.team_id, event_id: raw.event_id, event }))
        }
        _ => Err(EventParseError::UnknownType(tag.event_type)),
    }
}

pub async fn handle_event(State(state): State<AppState>, body: Bytes) -> Result<Response, HttpError> {
    let event = parse_event(&body).map_err(|err| HttpError::bad_request(err.to_string()))?;

    match event {
        EventsApiEvent::UrlVerification(verification) => {
            info!("Answering url verification challenge");
            Ok(Json(ChallengeResponse { challenge: verification.challenge }).into_response())
        }
        EventsApiEvent::AppRateLimited(notice) => {
            info!(
                "Slack rate limited event delivery, app: {:?}, team: {:?}, minute: {:?}",
                notice.api_app_id, notice.team_id, notice.minute_rate_limited
            );
            Ok((StatusCode::OK, "ack").into_response())
        }
        EventsApiEvent::Callback(callback) => match callback.event {
            InnerEvent::AppUninstalled => {
                state.token_store
                    .delete(&callback.team_id)
                    .map_err(|err| HttpError::internal(format!("error handling app uninstallation: {}", err)))?;

                info!("App uninstalled from workspace {} (event {:?}), access token removed", callback.team_id, callback.event_id);
                Ok(StatusCode::OK.into_response())
            }
            InnerEvent::Unhandled(event_type) => {
                Err(HttpError::bad_request(format!("no handler for event of type {}", event_type)))
            }
        },
    }
}
