//! Client configuration structures.

use crate::error::{ConfigError, Result};
use crate::modes::{CreateMode, DebugLevel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where and how to connect.
    #[serde(default)]
    pub connect: ConnectConfig,
    /// Driver logging controls.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Defaults applied to operations that omit an option.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl ClientConfig {
    /// Configuration pointing at a single host list, everything else default.
    pub fn for_hosts(hosts: impl Into<String>) -> Self {
        Self {
            connect: ConnectConfig {
                hosts: hosts.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.connect.validate()
    }
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Comma-separated `host:port` list.
    #[serde(default = "default_hosts")]
    pub hosts: String,
    /// Session timeout in milliseconds.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Optional root prefix; every client path is resolved beneath it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroot: Option<String>,
}

fn default_hosts() -> String {
    "127.0.0.1:2181".to_string()
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            session_timeout_ms: default_session_timeout_ms(),
            chroot: None,
        }
    }
}

impl ConnectConfig {
    /// Individual `host:port` entries, whitespace trimmed, empties dropped.
    pub fn host_list(&self) -> Vec<String> {
        self.hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Session timeout as a `Duration`.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Validate the connection settings.
    pub fn validate(&self) -> Result<()> {
        let hosts = self.host_list();
        if hosts.is_empty() {
            return Err(ConfigError::MissingField {
                field: "connect.hosts".to_string(),
            });
        }

        for host in &hosts {
            let valid = host
                .rsplit_once(':')
                .map(|(name, port)| !name.is_empty() && port.parse::<u16>().is_ok())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::invalid("connect.hosts", host.clone()));
            }
        }

        if self.session_timeout_ms == 0 {
            return Err(ConfigError::invalid("connect.session_timeout_ms", "0"));
        }

        if let Some(chroot) = &self.chroot {
            let valid = chroot.starts_with('/')
                && chroot.len() > 1
                && !chroot.ends_with('/')
                && !chroot.split('/').skip(1).any(|s| s.is_empty() || s == "." || s == "..");
            if !valid {
                return Err(ConfigError::invalid("connect.chroot", chroot.clone()));
            }
        }

        Ok(())
    }
}

/// Driver logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level requested from the driver on connect.
    #[serde(default)]
    pub debug_level: DebugLevel,
}

/// Operation defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Mode used by `create_default`.
    #[serde(default)]
    pub create_mode: CreateMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connect.host_list(), vec!["127.0.0.1:2181"]);
        assert_eq!(config.connect.session_timeout(), Duration::from_secs(30));
        assert_eq!(config.defaults.create_mode, CreateMode::Ephemeral);
        assert_eq!(config.logging.debug_level, DebugLevel::Warn);
    }

    #[test]
    fn test_host_list_trims_entries() {
        let config = ClientConfig::for_hosts(" zk1:2181, zk2:2182 ,,");
        assert_eq!(config.connect.host_list(), vec!["zk1:2181", "zk2:2182"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_hosts() {
        for hosts in ["", " , ", "zk1", "zk1:port", ":2181"] {
            let config = ClientConfig::for_hosts(hosts);
            assert!(config.validate().is_err(), "hosts {:?} should be rejected", hosts);
        }
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = ClientConfig::default();
        config.connect.session_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "connect.session_timeout_ms"
        ));
    }

    #[test]
    fn test_chroot_validation() {
        let mut config = ClientConfig::default();
        for good in ["/app", "/apps/billing"] {
            config.connect.chroot = Some(good.to_string());
            assert!(config.validate().is_ok(), "{} should be accepted", good);
        }
        for bad in ["/", "app", "/app/", "/a//b", "/a/../b"] {
            config.connect.chroot = Some(bad.to_string());
            assert!(config.validate().is_err(), "{} should be rejected", bad);
        }
    }
}
