use reqwest::{Client, StatusCode};

use crate::{arithmetic_handler::{ArithmeticRequest, ArithmeticResponse}, errors::ArithmeticError};

/// Client for the arithmetic service.
#[derive(Clone)]
pub struct Arithmetic {
    http_client: Client,
    base_url: String,
}

impl Arithmetic {
    pub fn new(http_client: Client, base_url: &str) -> Arithmetic {
        Arithmetic { http_client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub async fn add(&self, request: &ArithmeticRequest) -> Result<ArithmeticResponse, ArithmeticError> {
        let response = self.http_client
            .post(format!("{}/", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(ArithmeticError::Request)?;

        if response.status() != StatusCode::OK {
            return Err(ArithmeticError::Status(response.status().as_u16()));
        }

        response.json().await.map_err(ArithmeticError::Response)
    }
}
