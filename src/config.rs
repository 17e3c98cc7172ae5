//! Runtime configuration from environment variables.

use crate::error::{Result, SeedanceError};
use crate::video::providers::EvolinkProvider;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://seedance.db?mode=rwc";
const DEFAULT_GALLERY_PATH: &str = "gallery.json";
const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Settings shared by the CLI and the HTTP service.
#[derive(Debug, Clone)]
pub struct Config {
    /// `EVOLINK_API_KEY`; optional so that offline commands still work.
    pub evolink_api_key: Option<String>,
    /// `EVOLINK_API_BASE_URL`.
    pub evolink_base_url: Option<String>,
    /// `DATABASE_URL` of the credit ledger.
    pub database_url: String,
    /// `SEEDANCE_GALLERY_PATH`.
    pub gallery_path: PathBuf,
    /// `SEEDANCE_BIND`.
    pub bind_addr: SocketAddr,
    /// `SEEDANCE_POLL_INTERVAL_SECS`.
    pub poll_interval: Duration,
    /// `SEEDANCE_POLL_TIMEOUT_SECS`.
    pub poll_timeout: Duration,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = get("SEEDANCE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| SeedanceError::Config(format!("invalid SEEDANCE_BIND {bind}: {e}")))?;

        Ok(Self {
            evolink_api_key: get("EVOLINK_API_KEY"),
            evolink_base_url: get("EVOLINK_API_BASE_URL"),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            gallery_path: get("SEEDANCE_GALLERY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GALLERY_PATH)),
            bind_addr,
            poll_interval: secs(get("SEEDANCE_POLL_INTERVAL_SECS"), "SEEDANCE_POLL_INTERVAL_SECS", 3)?,
            poll_timeout: secs(get("SEEDANCE_POLL_TIMEOUT_SECS"), "SEEDANCE_POLL_TIMEOUT_SECS", 600)?,
        })
    }

    /// Builds the Evolink provider from these settings.
    pub fn evolink_provider(&self) -> Result<EvolinkProvider> {
        let mut builder = EvolinkProvider::builder()
            .poll_interval(self.poll_interval)
            .timeout(self.poll_timeout);
        if let Some(key) = &self.evolink_api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = &self.evolink_base_url {
            builder = builder.base_url(url);
        }
        builder.build()
    }
}

fn secs(value: Option<String>, key: &str, default: u64) -> Result<Duration> {
    match value {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| SeedanceError::Config(format!("{key} must be a positive integer, got {v}"))),
    }
}
