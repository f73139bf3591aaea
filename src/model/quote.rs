use chrono::NaiveDateTime;
use serde::Serialize;

/// A single price point reported by the quotation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub bid: f64,
    /// Provider-assigned event marker, the only field used to tell quotes apart.
    pub timestamp: i64,
    pub create_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredQuote {
    pub id: i64,
    pub quote: Quote,
}

/// Body of a successful `GET /cotacao`.
#[derive(Debug, Serialize)]
pub struct QuoteView {
    pub bid: f64,
}

impl From<&Quote> for QuoteView {
    fn from(quote: &Quote) -> QuoteView {
        QuoteView { bid: quote.bid }
    }
}
