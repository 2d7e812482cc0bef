//! HTTP GET with registry error semantics.
//!
//! Registries put human-readable failure text in the response body, so a
//! non-2xx status turns the body into the error message.

use reqwest::Client;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request for {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    Status {
        url: Url,
        status: reqwest::StatusCode,
        message: String,
    },
}

impl HttpError {
    /// True for responses the server answered with a failure status, as
    /// opposed to transport-level errors.
    pub fn is_status(&self) -> bool {
        matches!(self, HttpError::Status { .. })
    }
}

/// GET a URL, returning the successful response for streaming.
pub async fn get(client: &Client, url: Url) -> Result<reqwest::Response, HttpError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| HttpError::Transport {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
            _ => format!("received {status} response for {url}"),
        };
        return Err(HttpError::Status {
            url,
            status,
            message,
        });
    }

    Ok(response)
}

/// GET a URL and buffer the whole body.
pub async fn get_bytes(client: &Client, url: Url) -> Result<Vec<u8>, HttpError> {
    let response = get(client, url.clone()).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|source| HttpError::Transport { url, source })?;
    Ok(bytes.to_vec())
}
