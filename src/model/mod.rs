mod api_error;
pub use api_error::ApiError;
mod api_result;
pub use api_result::ApiResult;
mod error;
pub use error::{FetchError, StoreError};
mod quote;
pub use quote::{Quote, QuoteView, StoredQuote};
