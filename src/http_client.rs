use std::time::Duration;

use reqwest::{redirect, Client};

use crate::errors::AppError;

pub fn build_http_client(timeout: Duration) -> Result<Client, AppError> {
    let client = Client::builder()
        .timeout(timeout)
        .redirect(redirect::Policy::none())
        .build()?;

    Ok(client)
}
