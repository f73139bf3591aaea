//! One-shot consumer of the quotation service: fetches the current dollar
//! bid and writes it to a text file.
//!
//! ```bash
//! client [url] [output]
//! ```
mod quotation;

use std::{env, path::Path, process::exit, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080/cotacao";
const DEFAULT_OUTPUT: &str = "cotacao.txt";
const TIMEOUT: Duration = Duration::from_millis(300);

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let url = args.get(0).map(String::as_str).unwrap_or(DEFAULT_URL);
    let output = args.get(1).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);

    match quotation::run(url, Path::new(output), TIMEOUT).await {
        Ok(bid) => info!(bid, output, "Dollar quotation saved successfully"),
        Err(e) => {
            error!(%e, url, "Unable to save dollar quotation");
            exit(1);
        }
    }
}
