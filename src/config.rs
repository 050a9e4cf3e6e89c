// Gateway configuration, layered defaults -> config.toml -> BLASSA__* env vars

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_address: String,
    // Root of the backend REST API, e.g. https://host/api/v1/
    pub api_base_url: String,
    // Where the recent searches and credentials files live
    pub data_dir: PathBuf,
    pub page_size: u32,
    pub view_cache_ttl_secs: u64,
    pub view_cache_capacity: usize,
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("api_base_url", "https://blassa-production.up.railway.app/api/v1/")?
            .set_default("data_dir", ".blassa")?
            .set_default("page_size", 20)?
            .set_default("view_cache_ttl_secs", 5)?
            .set_default("view_cache_capacity", 32)?
            .set_default("request_timeout_secs", 30)?
            .add_source(File::with_name("config").required(false))
            // BLASSA__PAGE_SIZE=50, BLASSA__API_BASE_URL=...
            .add_source(
                Environment::with_prefix("BLASSA")
                    .prefix_separator("__")
                    .separator("__"),
            );

        let settings: Settings = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be greater than zero");
        }
        if self.view_cache_capacity == 0 {
            bail!("view_cache_capacity must be greater than zero");
        }
        self.socket_addr()?;
        reqwest::Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid api_base_url '{}'", self.api_base_url))?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server_address
            .parse()
            .with_context(|| format!("Invalid server address format: {}", self.server_address))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests(api_base_url: &str, data_dir: &std::path::Path) -> Self {
        Settings {
            server_address: "127.0.0.1:0".to_string(),
            api_base_url: api_base_url.to_string(),
            data_dir: data_dir.to_path_buf(),
            page_size: 2,
            view_cache_ttl_secs: 5,
            view_cache_capacity: 8,
            request_timeout_secs: 5,
        }
    }
}
