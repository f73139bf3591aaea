use crate::{
    conf::Conf,
    db::Db,
    model::{FetchError, Quote, QuoteView, StoreError, StoredQuote},
    provider::{AwesomeApi, Provider},
    service::change_gate::{self, Outcome},
};
use anyhow::Result;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed to fetch quotation: {0}")]
    Fetch(#[source] FetchError),
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] StoreError),
    #[error("Failed to create quote table: {0}")]
    Bootstrap(#[source] StoreError),
    #[error("Failed to save quotation: {0}")]
    Persist(#[source] StoreError),
    #[error("Failed to serialize quotation to JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ServiceError {
    pub fn stage(&self) -> &'static str {
        match self {
            ServiceError::Fetch(_) => "fetch",
            ServiceError::Connect(_) => "database connect",
            ServiceError::Bootstrap(_) => "table bootstrap",
            ServiceError::Persist(_) => "persistence",
            ServiceError::Serialize(_) => "serialization",
        }
    }
}

#[derive(Debug)]
pub struct Response {
    pub quote: Quote,
    /// `None` when the latest stored record already had this quote.
    pub persisted: Option<StoredQuote>,
    pub body: String,
}

/// Fetches the live quote, stores it if it's new and answers with its bid.
///
/// Holds no per-request state; each call opens its own database connection
/// and drops it on every exit path.
pub struct QuotationService {
    provider: Box<dyn Provider>,
    db: Db,
}

impl QuotationService {
    pub fn new(provider: Box<dyn Provider>, db: Db) -> QuotationService {
        QuotationService { provider, db }
    }

    pub fn from_conf(conf: &Conf) -> Result<QuotationService> {
        let provider = AwesomeApi::new(&conf.provider)?;
        let db = Db::new(conf.db_url(), conf.db.timeout());
        Ok(QuotationService::new(Box::new(provider), db))
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub async fn handle_request(&self) -> Result<Response, ServiceError> {
        let quote = self.provider.fetch().await.map_err(ServiceError::Fetch)?;
        info!(
            provider = %self.provider.name(),
            bid = quote.bid,
            timestamp = quote.timestamp,
            "Fetched quote"
        );

        let repo = self.db.connect().await.map_err(ServiceError::Connect)?;
        repo.bootstrap().await.map_err(ServiceError::Bootstrap)?;

        let persisted = match change_gate::maybe_persist(&repo, &quote).await {
            Outcome::Inserted(row) => Some(row),
            Outcome::Skipped => None,
            Outcome::Failed(e) => return Err(ServiceError::Persist(e)),
        };

        let body =
            serde_json::to_string(&QuoteView::from(&quote)).map_err(ServiceError::Serialize)?;

        Ok(Response {
            quote,
            persisted,
            body,
        })
    }
}
