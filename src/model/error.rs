use std::{
    num::{ParseFloatError, ParseIntError},
    time::Duration,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("error sending request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("provider responded with status {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("error decoding JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("pair {0} not found in response")]
    MissingPair(String),
    #[error("missing or mistyped quote field: {0}")]
    Fields(#[source] serde_json::Error),
    #[error("error parsing bid: {0}")]
    Bid(#[source] ParseFloatError),
    #[error("bid {0} is not a finite non-negative number")]
    InvalidBid(f64),
    #[error("error parsing timestamp: {0}")]
    Timestamp(#[source] ParseIntError),
    #[error("error parsing create_date: {0}")]
    CreateDate(#[source] chrono::ParseError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Connect(#[source] rusqlite::Error),
    #[error("{0}")]
    Bootstrap(#[source] rusqlite::Error),
    #[error("error querying database: {0}")]
    Query(#[source] rusqlite::Error),
    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("database operation cancelled before it started")]
    Cancelled,
    #[error("database task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
    #[error("database connection lock poisoned")]
    Poisoned,
}
