//! Configuration for the storefront client

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_STORAGE_DIR: &str = ".shopfront";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST backend, without trailing slash
    pub api_url: String,

    /// Live channel URL; derived from the API origin when unset
    pub socket_url: Option<Url>,

    /// Map/geocoding provider token
    pub map_token: Option<String>,

    /// ISO code of the display currency
    pub currency: String,

    /// Directory of the file-backed client storage
    pub storage_dir: PathBuf,

    /// Default page size of list views
    pub page_size: u32,

    /// The request timeout
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: None,
            map_token: None,
            currency: DEFAULT_CURRENCY.to_string(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl Config {
    /// Configuration pointed at `api_url`, everything else defaulted.
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: parse_http_url(api_url)?,
            ..Default::default()
        })
    }

    /// Read the `SHOPFRONT_*` environment variables, loading a `.env` file
    /// first when one exists. Every variable is optional.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_url) = var("SHOPFRONT_API_URL") {
            config.api_url = parse_http_url(&api_url)?;
        }
        if let Some(socket_url) = var("SHOPFRONT_SOCKET_URL") {
            config.socket_url = Some(Url::parse(&socket_url)?);
        }
        config.map_token = var("SHOPFRONT_MAP_TOKEN");
        if let Some(currency) = var("SHOPFRONT_CURRENCY") {
            config.currency = currency.trim().to_uppercase();
        }
        if let Some(dir) = var("SHOPFRONT_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(size) = var("SHOPFRONT_PAGE_SIZE") {
            config.page_size = size
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::config(format!("SHOPFRONT_PAGE_SIZE is not a positive number: {}", size))
                })?;
        }
        Ok(config)
    }

    /// The live channel URL: explicit, or the API origin with a ws scheme
    /// and path `/ws`.
    pub fn socket_url(&self) -> Result<Url> {
        if let Some(url) = &self.socket_url {
            return Ok(url.clone());
        }
        let mut url = Url::parse(&self.api_url)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            Error::config(format!("Cannot derive a live channel URL from {}", self.api_url))
        })?;
        url.set_path("/ws");
        url.set_query(None);
        Ok(url)
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, value: &str) -> Result<Self> {
        self.api_url = parse_http_url(value)?;
        Ok(self)
    }

    /// Set the live channel URL
    pub fn with_socket_url(mut self, value: &str) -> Result<Self> {
        self.socket_url = Some(Url::parse(value)?);
        Ok(self)
    }

    pub fn with_map_token(mut self, value: &str) -> Self {
        self.map_token = Some(value.to_string());
        self
    }

    pub fn with_currency(mut self, value: &str) -> Self {
        self.currency = value.to_uppercase();
        self
    }

    pub fn with_storage_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.storage_dir = value.into();
        self
    }

    pub fn with_page_size(mut self, value: u32) -> Self {
        self.page_size = value.max(1);
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }
}

fn parse_http_url(value: &str) -> Result<String> {
    let url = Url::parse(value)?;
    match url.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        other => Err(Error::config(format!("API URL must be http(s), got {}", other))),
    }
}
