use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};
use url::Url;

pub const MAX_INDEX_NAME_LEN: usize = 255;
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG_PATH";
pub const DEFAULT_INDEX: &str = "mn-es-idx";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub feeder: FeederConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_search_wait_secs")]
    pub search_wait_secs: u64,
    #[serde(default = "default_search_poll_limit")]
    pub search_poll_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeederConfig {
    #[serde(default = "default_feeder_enabled")]
    pub enabled: bool,
    #[serde(default = "default_feeder_interval_secs")]
    pub interval_secs: u64,
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_search_wait_secs() -> u64 {
    1
}

fn default_search_poll_limit() -> u32 {
    10
}

fn default_feeder_enabled() -> bool {
    true
}

fn default_feeder_interval_secs() -> u64 {
    10
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            enabled: default_feeder_enabled(),
            interval_secs: default_feeder_interval_secs(),
        }
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn search_wait(&self) -> Duration {
        Duration::from_secs(self.search_wait_secs)
    }
}

impl FeederConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Settings {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path()?,
        };
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("store.base_url", "http://127.0.0.1:9200")?
            .set_default("store.index", DEFAULT_INDEX)?
            .set_default("feeder.enabled", default_feeder_enabled())?
            .set_default("feeder.interval_secs", default_feeder_interval_secs() as i64)?
            .add_source(config::File::from(config_path).required(false))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"));

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("GATEWAY__SERVER_HOST") {
            self.server.host = value;
        }
        if let Ok(value) = env::var("GATEWAY__SERVER_PORT") {
            self.server.port = value
                .parse()
                .context("GATEWAY__SERVER_PORT must be a valid u16")?;
        }
        if let Ok(value) = env::var("GATEWAY__STORE_URL") {
            self.store.base_url = value;
        }
        if let Ok(value) = env::var("GATEWAY__STORE_INDEX") {
            self.store.index = value;
        }
        if let Ok(value) = env::var("GATEWAY__FEEDER_ENABLED") {
            self.feeder.enabled = value
                .parse()
                .context("GATEWAY__FEEDER_ENABLED must be a boolean")?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.validate_store()?;
        self.validate_feeder()?;
        Ok(())
    }

    fn validate_store(&self) -> Result<()> {
        let store = &self.store;
        let url = Url::parse(&store.base_url)
            .with_context(|| format!("store.base_url '{}' is not a valid URL", store.base_url))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            anyhow::bail!(
                "store.base_url '{}' must be an http(s) URL with a host",
                store.base_url
            );
        }
        if !is_valid_index_name(&store.index) {
            anyhow::bail!("store.index '{}' is not a valid index name", store.index);
        }
        if store.password.is_some() && store.username.is_none() {
            anyhow::bail!("store.password requires store.username");
        }
        if store.request_timeout_secs == 0 {
            anyhow::bail!("store.request_timeout_secs must be > 0");
        }
        if store.connect_timeout_secs == 0 {
            anyhow::bail!("store.connect_timeout_secs must be > 0");
        }
        if store.search_wait_secs == 0 {
            anyhow::bail!("store.search_wait_secs must be > 0");
        }
        if store.search_poll_limit == 0 {
            anyhow::bail!("store.search_poll_limit must be > 0");
        }
        Ok(())
    }

    fn validate_feeder(&self) -> Result<()> {
        if self.feeder.interval_secs == 0 {
            anyhow::bail!("feeder.interval_secs must be > 0");
        }
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join("config").join("gateway").join("default.toml"))
}

/// Index names must be lowercase, must not start with `-`, `_` or `+`,
/// and must not be `.` or `..`.
pub fn is_valid_index_name(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_INDEX_NAME_LEN || value == "." || value == ".." {
        return false;
    }
    if value.starts_with(['-', '_', '+']) {
        return false;
    }
    value.bytes().all(|byte| match byte {
        b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' | b'+' => true,
        _ => false,
    })
}
