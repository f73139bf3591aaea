use crate::{
    model::{Quote, StoreError, StoredQuote},
    repository::QuoteStore,
};
use tracing::{debug, info};

#[derive(Debug)]
pub enum Outcome {
    Inserted(StoredQuote),
    Skipped,
    Failed(StoreError),
}

/// Appends `quote` unless the latest stored record carries the same
/// provider timestamp. The bid is never compared.
pub async fn maybe_persist(store: &dyn QuoteStore, quote: &Quote) -> Outcome {
    let latest = match store.most_recent().await {
        Ok(latest) => latest,
        Err(e) => return Outcome::Failed(e),
    };

    if let Some(latest) = latest {
        if latest.quote.timestamp == quote.timestamp {
            debug!(id = latest.id, timestamp = quote.timestamp, "Quote unchanged, skipping");
            return Outcome::Skipped;
        }
    }

    match store.append(quote).await {
        Ok(row) => {
            info!(id = row.id, timestamp = quote.timestamp, bid = quote.bid, "Quote saved");
            Outcome::Inserted(row)
        }
        Err(e) => Outcome::Failed(e),
    }
}
