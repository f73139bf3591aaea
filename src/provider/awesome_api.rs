use crate::{
    conf::ProviderConf,
    model::{FetchError, Quote},
    provider::Provider,
};
use anyhow::Result;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const CREATE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quotes from economia.awesomeapi.com.br (`/json/last/<PAIR>`).
pub struct AwesomeApi {
    client: Client,
    url: String,
    pair_key: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct AwesomeApiQuote {
    bid: String,
    timestamp: String,
    create_date: String,
}

impl AwesomeApi {
    pub fn new(conf: &ProviderConf) -> Result<AwesomeApi> {
        let client = Client::builder().timeout(conf.timeout()).build()?;

        Ok(AwesomeApi {
            client,
            url: format!("{}/{}", conf.url.trim_end_matches('/'), conf.pair),
            pair_key: conf.pair_key(),
            timeout: conf.timeout(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e)
        }
    }

    fn body_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Body(e)
        }
    }
}

#[rocket::async_trait]
impl Provider for AwesomeApi {
    fn name(&self) -> String {
        "awesomeapi".into()
    }

    async fn fetch(&self) -> Result<Quote, FetchError> {
        debug!(url = %self.url, "Fetching quote");

        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.bytes().await.map_err(|e| self.body_error(e))?;
        parse_quote(&body, &self.pair_key)
    }
}

pub fn parse_quote(body: &[u8], pair_key: &str) -> Result<Quote, FetchError> {
    let mut pairs: Map<String, Value> = serde_json::from_slice(body).map_err(FetchError::Json)?;

    let quote = pairs
        .remove(pair_key)
        .ok_or_else(|| FetchError::MissingPair(pair_key.to_string()))?;

    let quote: AwesomeApiQuote = serde_json::from_value(quote).map_err(FetchError::Fields)?;

    let bid = quote.bid.trim().parse::<f64>().map_err(FetchError::Bid)?;

    if !bid.is_finite() || bid < 0.0 {
        return Err(FetchError::InvalidBid(bid));
    }

    Ok(Quote {
        bid,
        timestamp: quote
            .timestamp
            .trim()
            .parse::<i64>()
            .map_err(FetchError::Timestamp)?,
        create_date: NaiveDateTime::parse_from_str(&quote.create_date, CREATE_DATE_FORMAT)
            .map_err(FetchError::CreateDate)?,
    })
}
