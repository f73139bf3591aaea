use crate::model::{FetchError, Quote};

/// A source of live quotes. Implementations bound every call by their own
/// deadline and never retry.
#[rocket::async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> String;

    async fn fetch(&self) -> Result<Quote, FetchError>;
}
