use reqwest::Client;
use serde_json::Value;
use std::{fs, io, path::Path, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("error creating request: {0}")]
    Client(#[source] reqwest::Error),
    #[error("error sending request: {0}")]
    Send(#[source] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("error response from server ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("error reading response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("error decoding JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("invalid response format: bid not found or not a number")]
    MissingBid,
    #[error("error writing to file: {0}")]
    Write(#[source] io::Error),
}

/// Fetches the bid and writes it to `output`. The file is only touched once
/// everything before it succeeded.
pub async fn run(url: &str, output: &Path, timeout: Duration) -> Result<f64, ClientError> {
    let bid = fetch_bid(url, timeout).await?;
    fs::write(output, render(bid)).map_err(ClientError::Write)?;
    Ok(bid)
}

pub async fn fetch_bid(url: &str, timeout: Duration) -> Result<f64, ClientError> {
    let timed_out = |e: reqwest::Error, other: fn(reqwest::Error) -> ClientError| {
        if e.is_timeout() {
            ClientError::Timeout(timeout)
        } else {
            other(e)
        }
    };

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ClientError::Client)?;

    let res = client
        .get(url)
        .send()
        .await
        .map_err(|e| timed_out(e, ClientError::Send))?;

    let status = res.status();
    let body = res
        .bytes()
        .await
        .map_err(|e| timed_out(e, ClientError::Body))?;

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    parse_bid(&body)
}

pub fn parse_bid(body: &[u8]) -> Result<f64, ClientError> {
    let body: Value = serde_json::from_slice(body).map_err(ClientError::Json)?;
    body.get("bid")
        .and_then(Value::as_f64)
        .ok_or(ClientError::MissingBid)
}

pub fn render(bid: f64) -> String {
    format!("Dólar:{:.2}", bid)
}
