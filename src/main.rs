mod conf;
mod controller;
mod db;
mod model;
mod provider;
mod repository;
mod service;

use conf::Conf;
use model::ApiError;
use rocket::{catch, catchers, http::Status, routes, Build, Request, Rocket};
use service::QuotationService;
use std::{env, process::exit};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let conf = Conf::new().unwrap_or_else(|e| {
        error!(%e, "Unable to load configuration");
        exit(1);
    });

    let args: Vec<String> = env::args().skip(1).collect();

    if !args.is_empty() {
        db::cli(&args, &conf).await;
        return;
    }

    let service = QuotationService::from_conf(&conf).unwrap_or_else(|e| {
        error!(%e, "Unable to create quotation service");
        exit(1);
    });

    db::ensure_parent_dir(service.db().url()).unwrap_or_else(|e| {
        error!(%e, "Unable to create data directory");
        exit(1);
    });

    info!(port = conf.port, db_url = service.db().url(), "Starting server");

    let figment = rocket::Config::figment().merge(("port", conf.port));

    if let Err(e) = prepare(rocket::custom(figment), service).launch().await {
        error!(%e, "Server failed");
        exit(1);
    }
}

pub fn prepare(rocket: Rocket<Build>, service: QuotationService) -> Rocket<Build> {
    rocket
        .mount("/", routes![controller::quotation::get])
        .register("/", catchers![default_catcher])
        .manage(service)
}

#[catch(default)]
fn default_catcher(status: Status, req: &Request) -> ApiError {
    ApiError {
        code: status.code,
        message: format!("{}: failed to handle {}", status, req.uri()),
        stage: None,
    }
}
