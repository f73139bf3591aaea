use crate::{
    conf::Conf,
    model::StoreError,
    repository::QuoteRepository,
    service::QuotationService,
};
use anyhow::Result;
use rusqlite::Connection;
use std::{fs::remove_file, path::Path, process::exit, time::Duration};
use tokio::task;
use tracing::{error, info, warn};

/// Opens a fresh connection per request; nothing is pooled.
#[derive(Debug, Clone)]
pub struct Db {
    url: String,
    timeout: Duration,
}

impl Db {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Db {
        Db {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lock waits give up at twice the operation deadline, so a cancelled
    /// operation never holds on to the connection much past its deadline.
    pub async fn connect(&self) -> Result<QuoteRepository, StoreError> {
        let url = self.url.clone();
        let busy_timeout = self.timeout * 2;

        let conn = task::spawn_blocking(move || {
            let conn = Connection::open(&url)?;
            conn.busy_timeout(busy_timeout)?;
            Ok::<_, rusqlite::Error>(conn)
        })
        .await
        .map_err(StoreError::Task)?
        .map_err(StoreError::Connect)?;

        Ok(QuoteRepository::new(conn, self.timeout))
    }
}

pub async fn cli(args: &[String], conf: &Conf) {
    let first_arg = args.first().map(String::as_str).unwrap_or_default();

    match first_arg {
        "drop" => drop(conf).unwrap_or_else(|e| {
            error!(%e, "Unable to drop database");
            exit(1);
        }),
        "bootstrap" => bootstrap(conf).await.unwrap_or_else(|e| {
            error!(%e, "Bootstrap failed");
            exit(1);
        }),
        "sync" => sync(conf).await.unwrap_or_else(|e| {
            error!(%e, "Sync failed");
            exit(1);
        }),
        _ => {
            error!(?args, "Unknown argument");
            exit(1);
        }
    };
}

fn drop(conf: &Conf) -> Result<()> {
    warn!("Dropping database...");
    let db_url = conf.db_url();
    info!(%db_url);
    remove_file(db_url)?;
    warn!("Database has been dropped");
    Ok(())
}

async fn bootstrap(conf: &Conf) -> Result<()> {
    let db = Db::new(conf.db_url(), conf.db.timeout());
    ensure_parent_dir(db.url())?;
    info!(db_url = db.url(), "Creating quote table");
    db.connect().await?.bootstrap().await?;
    info!("Quote table is ready");
    Ok(())
}

async fn sync(conf: &Conf) -> Result<()> {
    let service = QuotationService::from_conf(conf)?;
    ensure_parent_dir(service.db().url())?;
    let res = service.handle_request().await?;

    match res.persisted {
        Some(row) => info!(id = row.id, bid = row.quote.bid, "Stored new quote"),
        None => info!(bid = res.quote.bid, "Quote unchanged"),
    }

    Ok(())
}

pub fn ensure_parent_dir(db_url: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}
