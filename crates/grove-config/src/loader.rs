//! Configuration loading from TOML files and environment overrides.

use crate::config::ClientConfig;
use crate::error::{ConfigError, Result};
use std::path::Path;
use tracing::debug;

/// Environment variable overriding `connect.hosts`.
pub const ENV_HOSTS: &str = "GROVE_HOSTS";
/// Environment variable overriding `connect.session_timeout_ms`.
pub const ENV_SESSION_TIMEOUT_MS: &str = "GROVE_SESSION_TIMEOUT_MS";
/// Environment variable overriding `logging.debug_level`.
pub const ENV_DEBUG_LEVEL: &str = "GROVE_DEBUG_LEVEL";

/// Loads [`ClientConfig`] values.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a configuration from TOML text. Missing sections take defaults.
    pub fn from_toml_str(content: &str) -> Result<ClientConfig> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading client configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `GROVE_*` overrides from the process environment.
    pub fn from_env_overrides(config: ClientConfig) -> Result<ClientConfig> {
        Self::apply_overrides(config, std::env::vars())
    }

    /// Apply `GROVE_*` overrides from an explicit variable list.
    ///
    /// Unknown variables are ignored; known variables with unparsable values
    /// are rejected.
    pub fn apply_overrides<I, K, V>(mut config: ClientConfig, vars: I) -> Result<ClientConfig>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                ENV_HOSTS => config.connect.hosts = value.to_string(),
                ENV_SESSION_TIMEOUT_MS => {
                    config.connect.session_timeout_ms = value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::invalid(ENV_SESSION_TIMEOUT_MS, value))?;
                }
                ENV_DEBUG_LEVEL => config.logging.debug_level = value.parse()?,
                _ => continue,
            }
            debug!(variable = key.as_ref(), "Applied environment override");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CreateMode, DebugLevel};
    use std::io::Write;

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [connect]
            hosts = "zk1:2181,zk2:2181"
            session_timeout_ms = 15000
            chroot = "/apps/billing"

            [logging]
            debug_level = "info"

            [defaults]
            create_mode = "persistent_sequential"
        "#;

        let config = ConfigLoader::from_toml_str(toml).unwrap();
        assert_eq!(config.connect.host_list().len(), 2);
        assert_eq!(config.connect.session_timeout_ms, 15000);
        assert_eq!(config.connect.chroot.as_deref(), Some("/apps/billing"));
        assert_eq!(config.logging.debug_level, DebugLevel::Info);
        assert_eq!(config.defaults.create_mode, CreateMode::PersistentSequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ConfigLoader::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let toml = "[defaults]\ncreate_mode = \"sticky\"\n";
        assert!(matches!(
            ConfigLoader::from_toml_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connect]\nhosts = \"localhost:2181\"").unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.connect.hosts, "localhost:2181");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars = [
            (ENV_HOSTS, "zk9:2181"),
            (ENV_SESSION_TIMEOUT_MS, "5000"),
            (ENV_DEBUG_LEVEL, "debug"),
            ("UNRELATED", "ignored"),
        ];
        let config = ConfigLoader::apply_overrides(ClientConfig::default(), vars).unwrap();
        assert_eq!(config.connect.hosts, "zk9:2181");
        assert_eq!(config.connect.session_timeout_ms, 5000);
        assert_eq!(config.logging.debug_level, DebugLevel::Debug);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let result =
            ConfigLoader::apply_overrides(ClientConfig::default(), [(ENV_DEBUG_LEVEL, "loud")]);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = ConfigLoader::apply_overrides(
            ClientConfig::default(),
            [(ENV_SESSION_TIMEOUT_MS, "soon")],
        );
        assert!(result.is_err());
    }
}
