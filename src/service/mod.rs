pub mod change_gate;
pub use change_gate::Outcome;
pub mod quotation;
pub use quotation::{QuotationService, Response, ServiceError};
