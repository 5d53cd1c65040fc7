//! Settings and configuration module
//!
//! Provides the interceptor configuration with:
//! - Serde defaults for every field
//! - JSON loading
//! - Feature flags for the LFS media path

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on followed 302 hops per intercepted request.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Git LFS media handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfsConfig {
    pub enabled: bool,
    /// Host serving repositories and `/raw/` files.
    pub site_host: String,
    /// Host serving `/media/` user-content addresses.
    pub media_host: String,
    /// `content-disposition` written onto resolved media responses.
    pub forced_disposition: String,
}

impl Default for LfsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            site_host: "github.com".into(),
            media_host: "media.githubusercontent.com".into(),
            forced_disposition: "inline; filename=image.jpg".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    pub max_redirects: usize,
    /// Copy the request referrer into a `Referer` header.
    pub forward_referrer: bool,
    pub enable_metrics: bool,
    pub lfs: LfsConfig,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            forward_referrer: true,
            enable_metrics: true,
            lfs: LfsConfig::default(),
        }
    }
}

impl InterceptorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lfs.enabled && (self.lfs.site_host.is_empty() || self.lfs.media_host.is_empty()) {
            return Err(ConfigError::Invalid(
                "lfs hosts must be set when lfs handling is enabled".into(),
            ));
        }
        if self.lfs.forced_disposition.chars().any(|c| c.is_control()) {
            return Err(ConfigError::Invalid(
                "forced_disposition contains control characters".into(),
            ));
        }
        Ok(())
    }
}
