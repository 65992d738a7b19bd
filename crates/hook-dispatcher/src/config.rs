// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Dispatcher configuration.
//!
//! Loaded in priority order:
//! 1. YAML file (`config.yaml` unless `HOOK_DISPATCHER_CONFIG` says otherwise)
//! 2. Environment variables prefixed with `HOOK_DISPATCHER_` (highest priority).
//!    Nested keys use `__`, e.g. `HOOK_DISPATCHER_KAFKA__ADDRESS`.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use reqwest::Url;
use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "HOOK_DISPATCHER_";
pub const ENV_CONFIG_PATH: &str = "HOOK_DISPATCHER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_GROUP_NAME: &str = "hook-dispatcher";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// Process-level switches that share the prefix but are not part of the file schema.
const IGNORED_ENV_KEYS: [&str; 3] = ["config", "log_level", "enable_debug"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_group_name")]
    pub group_name: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            group_name: default_group_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Topic the dispatcher subscribes to
    pub topic: String,
    /// Expected value of the `User-Agent` header on every inbound message
    pub user_agent: String,
    /// Webhook endpoint messages are POSTed to
    pub access_endpoint: String,
    /// Maximum number of forwards per one-second window. Values <= 0 disable throttling.
    pub concurrent_size: i64,
    /// Timeout for each outbound request, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    pub https_proxy: Option<String>,
    #[serde(default)]
    pub kafka: KafkaConfig,
}

impl Config {
    /// Reads the file and environment without validating the result.
    ///
    /// Used for live reloads, where only the rate ceiling is picked up and a
    /// non-positive ceiling is allowed.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&IGNORED_ENV_KEYS).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Reads and validates the startup configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.is_empty() {
            return Err(ConfigError::Invalid("missing topic".to_string()));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid("missing user_agent".to_string()));
        }

        if self.access_endpoint.is_empty() {
            return Err(ConfigError::Invalid("missing access_endpoint".to_string()));
        }

        match Url::parse(&self.access_endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid(format!(
                    "access_endpoint scheme '{}' is not http or https",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Err(ConfigError::Invalid(format!(
                    "access_endpoint '{}' is not a valid URL: {e}",
                    self.access_endpoint
                )));
            }
        }

        if let Some(proxy) = &self.https_proxy {
            if let Err(e) = reqwest::Proxy::https(proxy.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "https_proxy '{proxy}' is not a valid proxy URL: {e}"
                )));
            }
        }

        if self.concurrent_size <= 0 {
            return Err(ConfigError::Invalid(
                "concurrent_size must be > 0".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.kafka.address.is_empty() {
            return Err(ConfigError::Invalid("missing kafka.address".to_string()));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}
