use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::HttpError;

/// Missing operands count as 0.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ArithmeticRequest {
    #[serde(default)]
    pub num1: i64,
    #[serde(default)]
    pub num2: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ArithmeticResponse {
    pub sum: i64,
}

impl ArithmeticRequest {
    pub fn sum(&self) -> ArithmeticResponse {
        ArithmeticResponse { sum: self.num1.wrapping_add(self.num2) }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("EOF")]
    Empty,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Decodes the first JSON value of the body; anything after it is ignored.
pub fn decode_request(body: &[u8]) -> Result<ArithmeticRequest, DecodeError> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<ArithmeticRequest>()
        .next()
        .ok_or(DecodeError::Empty)?
        .map_err(DecodeError::from)
}

pub async fn handle_add(body: Bytes) -> Result<Response, HttpError> {
    let request = decode_request(&body)
        .map_err(|err| HttpError::bad_request(format!("error reading request body: {}", err)))?;

    Ok((StatusCode::OK, Json(request.sum())).into_response())
}

pub fn arithmetic_router() -> Router {
    Router::new().route("/", post(handle_add))
}
