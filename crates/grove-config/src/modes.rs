//! Node creation modes and driver debug levels.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a node is created: whether it outlives its session, and whether the
/// service appends a sequence number to its name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// Removed when the creating session ends.
    #[default]
    Ephemeral,
    /// Ephemeral, with a per-parent increasing numeric suffix.
    EphemeralSequential,
    /// Survives the creating session.
    Persistent,
    /// Persistent, with a per-parent increasing numeric suffix.
    PersistentSequential,
}

impl CreateMode {
    /// Build a mode from its two independent flags.
    pub fn from_flags(ephemeral: bool, sequential: bool) -> Self {
        match (ephemeral, sequential) {
            (true, false) => Self::Ephemeral,
            (true, true) => Self::EphemeralSequential,
            (false, false) => Self::Persistent,
            (false, true) => Self::PersistentSequential,
        }
    }

    /// Whether the node is tied to the creating session.
    pub fn is_ephemeral(self) -> bool {
        matches!(self, Self::Ephemeral | Self::EphemeralSequential)
    }

    /// Whether the service assigns a sequence suffix.
    pub fn is_sequential(self) -> bool {
        matches!(self, Self::EphemeralSequential | Self::PersistentSequential)
    }

    /// Wire flag value (persistent 0, ephemeral 1, sequential adds 2).
    pub fn as_flags(self) -> i32 {
        let mut flags = 0;
        if self.is_ephemeral() {
            flags |= 1;
        }
        if self.is_sequential() {
            flags |= 2;
        }
        flags
    }

    /// Get a string representation of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ephemeral => "ephemeral",
            Self::EphemeralSequential => "ephemeral_sequential",
            Self::Persistent => "persistent",
            Self::PersistentSequential => "persistent_sequential",
        }
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreateMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ephemeral" => Ok(Self::Ephemeral),
            "ephemeral_sequential" => Ok(Self::EphemeralSequential),
            "persistent" => Ok(Self::Persistent),
            "persistent_sequential" => Ok(Self::PersistentSequential),
            _ => Err(ConfigError::invalid("create_mode", s)),
        }
    }
}

/// Verbosity requested from the underlying driver's own logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    /// Errors only.
    Error,
    /// Errors and warnings.
    #[default]
    Warn,
    /// Informational messages.
    Info,
    /// Everything, including per-request traces.
    Debug,
}

impl DebugLevel {
    /// Numeric level understood by drivers (1 = error .. 4 = debug).
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Error => 1,
            Self::Warn => 2,
            Self::Info => 3,
            Self::Debug => 4,
        }
    }

    /// Get a string representation of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebugLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(ConfigError::invalid("debug_level", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_ephemeral() {
        let mode = CreateMode::default();
        assert!(mode.is_ephemeral());
        assert!(!mode.is_sequential());
    }

    #[test]
    fn test_mode_flags_are_independent() {
        for ephemeral in [true, false] {
            for sequential in [true, false] {
                let mode = CreateMode::from_flags(ephemeral, sequential);
                assert_eq!(mode.is_ephemeral(), ephemeral);
                assert_eq!(mode.is_sequential(), sequential);
            }
        }
        assert_eq!(CreateMode::Persistent.as_flags(), 0);
        assert_eq!(CreateMode::EphemeralSequential.as_flags(), 3);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "persistent-sequential".parse::<CreateMode>().unwrap(),
            CreateMode::PersistentSequential
        );
        assert_eq!(" Ephemeral ".parse::<CreateMode>().unwrap(), CreateMode::Ephemeral);

        let err = "sticky".parse::<CreateMode>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "sticky"));
    }

    #[test]
    fn test_debug_level_parsing() {
        assert_eq!("DEBUG".parse::<DebugLevel>().unwrap(), DebugLevel::Debug);
        assert_eq!("warning".parse::<DebugLevel>().unwrap(), DebugLevel::Warn);
        assert!("verbose".parse::<DebugLevel>().is_err());
        assert!(DebugLevel::Error < DebugLevel::Debug);
    }
}
