use super::ApiError;
use crate::service::ServiceError;
use rocket::{response::content::RawJson, Responder};

#[derive(Responder)]
pub enum ApiResult {
    Ok(RawJson<String>),
    Err(ApiError),
}

impl ApiResult {
    pub fn new(result: Result<String, ServiceError>) -> ApiResult {
        match result {
            Ok(body) => ApiResult::Ok(RawJson(body)),
            Err(e) => ApiResult::Err(e.into()),
        }
    }
}
