//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment once at startup; `dotenv` is
//! loaded on demand by the binaries. Credentials are required and validated
//! here so request handlers never touch the environment. Everything else has
//! development-friendly defaults.
use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub runpod_api_key: String,
    pub runpod_endpoint_id: String,
    pub runpod_api_base: String,
    pub workflows_dir: String,
    pub api_host: String,
    pub api_port: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub download_timeout_secs: u64,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    /// Build a config from the environment.
    ///
    /// Fails with `AppError::Configuration` if `RUNPOD_API_KEY` or
    /// `RUNPOD_ENDPOINT_ID` is absent or empty, before any network call is
    /// ever attempted.
    pub fn from_env() -> AppResult<Self> {
        let runpod_api_key = require("RUNPOD_API_KEY")?;
        let runpod_endpoint_id = require("RUNPOD_ENDPOINT_ID")?;

        Ok(Config {
            runpod_api_key,
            runpod_endpoint_id,
            runpod_api_base: env::var("RUNPOD_API_BASE")
                .unwrap_or_else(|_| "https://api.runpod.ai".to_string()),
            workflows_dir: env::var("WORKFLOWS_DIR").unwrap_or_else(|_| "./workflows".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8189".to_string()),
            poll_interval_ms: parse_or("POLL_INTERVAL_MS", 1000),
            poll_max_attempts: parse_or("POLL_MAX_ATTEMPTS", 180),
            download_timeout_secs: parse_or("DOWNLOAD_TIMEOUT_SECS", 30),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn require(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Configuration(format!("{} is not set", key))),
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} '{}', falling back to default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
