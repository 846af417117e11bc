//! Response handling shared by the JSON provider clients.

use crate::{Error, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> Error {
    tracing::error!("{} API error (status {}): {}", provider, status, body);
    Error::AiProvider(format!("{} API error (status {}): {}", provider, status, body))
}

/// Fail on a non-2xx status, otherwise decode the body as `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(status_error(provider, status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Unreadable {} response: {}\nBody: {}", provider, e, body);
        Error::AiProvider(format!("Failed to parse {} response: {}", provider, e))
    })
}
