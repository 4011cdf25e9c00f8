use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of connection attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 10,
        }
    }
}

/// Global configuration loaded from `~/.config/otad/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtadConfig {
    /// Update file URL. The CLI can override this per invocation.
    #[serde(default)]
    pub url: Option<String>,
    /// Directory the update file and its temp/checkpoint files live in.
    /// Defaults to the current directory when unset.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Socket read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for OtadConfig {
    fn default() -> Self {
        Self {
            url: None,
            download_dir: None,
            connect_timeout_secs: 15,
            read_timeout_secs: 30,
            retry: None,
        }
    }
}

impl OtadConfig {
    /// Retry policy for connection failures, from the optional `[retry]`
    /// section or built-in defaults.
    pub fn retry_policy(&self) -> RetryPolicy {
        match &self.retry {
            Some(r) => RetryPolicy {
                max_attempts: r.max_attempts.max(1),
                base_delay: Duration::from_secs_f64(r.base_delay_secs.max(0.0)),
                max_delay: Duration::from_secs(r.max_delay_secs),
            },
            None => RetryPolicy::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("otad")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<OtadConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = OtadConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: OtadConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = OtadConfig::default();
        assert_eq!(cfg.connect_timeout_secs, 15);
        assert_eq!(cfg.read_timeout_secs, 30);
        assert!(cfg.url.is_none());
        assert!(cfg.download_dir.is_none());
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = OtadConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: OtadConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.connect_timeout_secs, cfg.connect_timeout_secs);
        assert_eq!(parsed.read_timeout_secs, cfg.read_timeout_secs);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            url = "https://updates.example.com/firmware/update.bin"
            download_dir = "/var/lib/otad"
            connect_timeout_secs = 5
            read_timeout_secs = 60
        "#;
        let cfg: OtadConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            cfg.url.as_deref(),
            Some("https://updates.example.com/firmware/update.bin")
        );
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/var/lib/otad")));
        assert_eq!(cfg.connect_timeout_secs, 5);
        assert_eq!(cfg.read_timeout_secs, 60);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            connect_timeout_secs = 15
            read_timeout_secs = 30

            [retry]
            max_attempts = 5
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: OtadConfig = toml::from_str(toml).unwrap();
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(15));
    }

    #[test]
    fn retry_policy_defaults_without_section() {
        let cfg = OtadConfig::default();
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 3);
    }
}
