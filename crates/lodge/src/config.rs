//! Configuration management for Lodge.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use lodge_common::LodgeError;
use lodge_common::constants::{
    CODE_TTL_SECS, DEFAULT_LISTEN_ADDR, MAX_CODE_TTL_SECS, STORE_SHARDS, SWEEP_INTERVAL_SECS,
};

/// Prefix for environment overrides, e.g. `LODGE__VERIFICATION__CODE_TTL_SECS`
const ENV_PREFIX: &str = "LODGE";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Verification code configuration
    #[serde(default)]
    pub verification: VerificationConfig,
}

/// Verification-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Code validity in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,

    /// Seconds between expired-code sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Number of store shards
    #[serde(default = "default_shards")]
    pub shards: usize,
}

impl VerificationConfig {
    /// Code validity as a signed duration
    pub fn code_ttl(&self) -> Result<chrono::Duration, LodgeError> {
        i64::try_from(self.code_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                LodgeError::Config(format!(
                    "verification.code_ttl_secs {} is out of range",
                    self.code_ttl_secs
                ))
            })
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            shards: default_shards(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_code_ttl() -> u64 { CODE_TTL_SECS } // 5 minutes
fn default_sweep_interval() -> u64 { SWEEP_INTERVAL_SECS }
fn default_shards() -> usize { STORE_SHARDS }

impl AppConfig {
    /// Load configuration from file and environment, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        if !Path::new(config_path).exists() {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load config")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }

        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), LodgeError> {
        let v = &self.verification;
        if v.code_ttl_secs == 0 {
            return Err(LodgeError::Config("verification.code_ttl_secs must be > 0".into()));
        }
        if v.code_ttl_secs > MAX_CODE_TTL_SECS {
            return Err(LodgeError::Config(format!(
                "verification.code_ttl_secs must be <= {MAX_CODE_TTL_SECS}"
            )));
        }
        if v.sweep_interval_secs == 0 {
            return Err(LodgeError::Config(
                "verification.sweep_interval_secs must be > 0".into(),
            ));
        }
        if v.shards == 0 {
            return Err(LodgeError::Config("verification.shards must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(LodgeError::Config("request_timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_request_timeout(),
            verification: VerificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_missing_file_uses_defaults() {
        let args = super::super::Args::parse_from(["lodge"]);
        let config = AppConfig::load("does/not/exist.toml", &args).unwrap();

        assert_eq!(config.verification.code_ttl_secs, 300);
        assert_eq!(config.verification.sweep_interval_secs, 60);
        assert_eq!(config.verification.shards, 16);
    }

    #[test]
    fn test_cli_listen_override() {
        let args = super::super::Args::parse_from(["lodge", "--listen", "0.0.0.0:9999"]);
        let config = AppConfig::load("does/not/exist.toml", &args).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9999");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = std::env::temp_dir().join(format!("lodge-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lodge.toml");
        std::fs::write(
            &path,
            "[verification]\ncode_ttl_secs = 120\nshards = 4\n",
        )
        .unwrap();

        let args = super::super::Args::parse_from(["lodge"]);
        let config = AppConfig::load(path.to_str().unwrap(), &args).unwrap();

        assert_eq!(config.verification.code_ttl_secs, 120);
        assert_eq!(config.verification.shards, 4);
        assert_eq!(config.verification.sweep_interval_secs, 60);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = AppConfig::default();
        config.verification.code_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(LodgeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_ttl() {
        for ttl in [MAX_CODE_TTL_SECS + 1, 10_000_000_000_000_000, u64::MAX] {
            let mut config = AppConfig::default();
            config.verification.code_ttl_secs = ttl;
            assert!(matches!(config.validate(), Err(LodgeError::Config(_))));
        }

        let mut config = AppConfig::default();
        config.verification.code_ttl_secs = MAX_CODE_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_code_ttl_conversion_never_wraps() {
        let mut v = VerificationConfig::default();
        assert_eq!(v.code_ttl().unwrap(), chrono::Duration::seconds(300));

        v.code_ttl_secs = u64::MAX;
        assert!(matches!(v.code_ttl(), Err(LodgeError::Config(_))));
    }

    #[test]
    fn test_oversized_ttl_from_file_fails_load() {
        let dir = std::env::temp_dir().join(format!("lodge-config-ttl-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lodge.toml");
        std::fs::write(&path, "[verification]\ncode_ttl_secs = 90000\n").unwrap();

        let args = super::super::Args::parse_from(["lodge"]);
        assert!(AppConfig::load(path.to_str().unwrap(), &args).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
