use crate::service::ServiceError;
use rocket::{
    http::{ContentType, Status},
    request::Request,
    response::{self, Responder, Response},
};
use std::io::Cursor;
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    pub stage: Option<&'static str>,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        if let Some(stage) = self.stage {
            error!(stage, message = %self.message, "Error from controller");
        }

        let body = self.message;

        Response::build()
            .header(ContentType::Plain)
            .status(Status::new(self.code))
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError {
            code: Status::InternalServerError.code,
            message: e.to_string(),
            stage: Some(e.stage()),
        }
    }
}
