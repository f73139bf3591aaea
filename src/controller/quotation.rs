use crate::{model::ApiResult, service::QuotationService};
use rocket::{get, State};

#[get("/cotacao")]
pub async fn get(service: &State<QuotationService>) -> ApiResult {
    ApiResult::new(service.handle_request().await.map(|res| res.body))
}
