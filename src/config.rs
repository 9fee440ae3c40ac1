use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::{DEFAULT_REF_POINT_LABEL, ToolOptions};
use crate::encode::{DEFAULT_BASE_URL, DEFAULT_METADATA_TIMEOUT};
use crate::error::FlowError;
use crate::retry::{DEFAULT_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "encode-flow.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry: Option<RetryEntry>,
    #[serde(default)]
    pub strict_tools: Option<bool>,
    #[serde(default)]
    pub ref_point_label: Option<String>,
    #[serde(default)]
    pub tool_options: ToolOptions,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryEntry {
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub delay_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub metadata_timeout: Duration,
    pub retry: RetryPolicy,
    pub strict_tools: bool,
    pub ref_point_label: String,
    pub tool_options: ToolOptions,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            base_url: DEFAULT_BASE_URL.to_string(),
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            retry: RetryPolicy::default(),
            strict_tools: false,
            ref_point_label: DEFAULT_REF_POINT_LABEL.to_string(),
            tool_options: ToolOptions::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `encode-flow.json` from the working directory when no
    /// path is given. Only an explicitly named file has to exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, FlowError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(FlowError::MissingConfig(config_path));
            }
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FlowError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| FlowError::ConfigParse(err.to_string()))?;

        tracing::debug!("loaded config from {}", config_path.display());
        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, FlowError> {
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(FlowError::ConfigParse(format!(
                "base_url must be an http(s) URL: {base_url}"
            )));
        }

        let retry = config.retry.unwrap_or_default();
        let retry = RetryPolicy::new(
            retry.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry
                .delay_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_DELAY),
        );

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            base_url,
            metadata_timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_METADATA_TIMEOUT),
            retry,
            strict_tools: config.strict_tools.unwrap_or(false),
            ref_point_label: config
                .ref_point_label
                .unwrap_or_else(|| DEFAULT_REF_POINT_LABEL.to_string()),
            tool_options: config.tool_options,
        })
    }
}
