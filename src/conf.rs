use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::{env, include_bytes, path::PathBuf, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Conf {
    pub port: u16,
    pub provider: ProviderConf,
    pub db: DbConf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConf {
    pub url: String,
    pub pair: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConf {
    #[serde(default)]
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Conf {
    pub fn new() -> Result<Conf> {
        let default_conf = include_bytes!("../cotacao.conf");
        let default_conf = String::from_utf8_lossy(default_conf);

        let custom_conf_path = data_dir().join("cotacao.conf");

        let conf: Conf = Figment::new()
            .merge(Toml::string(&default_conf))
            .merge(Toml::file(custom_conf_path))
            .merge(Env::prefixed("COTACAO_").split("__"))
            .extract()?;

        Ok(conf)
    }

    pub fn db_url(&self) -> String {
        match &self.db.url {
            Some(url) => url.clone(),
            None => data_dir().join("cotacao.db").display().to_string(),
        }
    }
}

impl ProviderConf {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The provider keys its payload by the pair without the separator,
    /// `USD-BRL` becomes `USDBRL`.
    pub fn pair_key(&self) -> String {
        self.pair.replace('-', "")
    }
}

impl DbConf {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub fn data_dir() -> PathBuf {
    env::var_os("DATA_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::data_dir().map(|dir| dir.join("cotacao")))
        .unwrap_or_else(|| PathBuf::from("."))
}
