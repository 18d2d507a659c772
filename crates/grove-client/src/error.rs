//! Result codes, error kinds, and the translation between them.
//!
//! Drivers report every outcome as a numeric [`ResultCode`]. [`validate`]
//! turns a non-Ok response into a typed [`Error`] and passes Ok responses
//! through untouched.

use crate::types::Response;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Numeric outcome of an operation, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// Success.
    Ok,
    /// The connection to the service was lost mid-operation.
    ConnectionLoss,
    /// The handle is closed or otherwise unusable.
    InvalidState,
    /// The node does not exist.
    NoNode,
    /// The supplied version does not match the node's version.
    BadVersion,
    /// The node already exists.
    NodeExists,
    /// The node has children and cannot be deleted.
    NotEmpty,
    /// The session has expired.
    SessionExpired,
    /// Any other code.
    Unknown(i32),
}

impl ResultCode {
    /// Decode a numeric result code.
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -4 => Self::ConnectionLoss,
            -9 => Self::InvalidState,
            -101 => Self::NoNode,
            -103 => Self::BadVersion,
            -110 => Self::NodeExists,
            -111 => Self::NotEmpty,
            -112 => Self::SessionExpired,
            other => Self::Unknown(other),
        }
    }

    /// Encode back to the numeric result code.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::ConnectionLoss => -4,
            Self::InvalidState => -9,
            Self::NoNode => -101,
            Self::BadVersion => -103,
            Self::NodeExists => -110,
            Self::NotEmpty => -111,
            Self::SessionExpired => -112,
            Self::Unknown(code) => code,
        }
    }

    /// Whether this code means success.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// The failure kind this code maps to, `None` for `Ok`.
    pub fn error_kind(self) -> Option<ErrorKind> {
        let kind = match self {
            Self::Ok => return None,
            Self::ConnectionLoss => ErrorKind::ConnectionLoss,
            Self::InvalidState => ErrorKind::InvalidState,
            Self::NoNode => ErrorKind::NoNode,
            Self::BadVersion => ErrorKind::BadVersion,
            Self::NodeExists => ErrorKind::NodeExists,
            Self::NotEmpty => ErrorKind::NotEmpty,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::Unknown(code) => ErrorKind::Unknown(code),
        };
        Some(kind)
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self::from_i32(code)
    }
}

/// Discriminant for matching on [`Error`] without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The node does not exist.
    NoNode,
    /// The node already exists.
    NodeExists,
    /// The node has children.
    NotEmpty,
    /// Optimistic version check failed.
    BadVersion,
    /// Connection lost, or the driver dropped the operation.
    ConnectionLoss,
    /// Session expired.
    SessionExpired,
    /// Handle closed.
    InvalidState,
    /// Unrecognized service result code.
    Unknown(i32),
    /// Rejected locally before any I/O.
    InvalidArgument,
    /// The driver does not support the requested capability.
    Unsupported,
    /// The driver returned a success response missing required fields.
    Protocol,
    /// Configuration could not be used.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNode => f.write_str("no node"),
            Self::NodeExists => f.write_str("node exists"),
            Self::NotEmpty => f.write_str("node not empty"),
            Self::BadVersion => f.write_str("bad version"),
            Self::ConnectionLoss => f.write_str("connection loss"),
            Self::SessionExpired => f.write_str("session expired"),
            Self::InvalidState => f.write_str("invalid state"),
            Self::Unknown(code) => write!(f, "unknown result code {}", code),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::Protocol => f.write_str("protocol error"),
            Self::Config => f.write_str("configuration error"),
        }
    }
}

/// Errors returned by client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The service rejected an operation on `path`.
    #[error("{kind} for path '{path}'")]
    Operation {
        /// What went wrong
        kind: ErrorKind,
        /// Client-visible path of the failed operation
        path: String,
    },

    /// The client handle has been closed.
    #[error("Client is closed")]
    Closed,

    /// An argument was rejected before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The driver does not support the request.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// The driver returned a success response without a required field.
    #[error("Malformed response for path '{path}': missing {field}")]
    Protocol {
        /// Path of the operation
        path: String,
        /// The absent response field
        field: &'static str,
    },

    /// Connection establishment failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] grove_config::ConfigError),
}

impl Error {
    /// Build an error from a non-Ok result code.
    pub fn from_code(code: ResultCode, path: impl Into<String>) -> Self {
        Self::Operation {
            kind: code.error_kind().unwrap_or(ErrorKind::Unknown(0)),
            path: path.into(),
        }
    }

    pub(crate) fn connection_loss(path: impl Into<String>) -> Self {
        Self::Operation {
            kind: ErrorKind::ConnectionLoss,
            path: path.into(),
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Operation { kind, .. } => *kind,
            Self::Closed => ErrorKind::InvalidState,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Connect(_) => ErrorKind::ConnectionLoss,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Shorthand for `kind() == ErrorKind::NoNode`.
    pub fn is_no_node(&self) -> bool {
        self.kind() == ErrorKind::NoNode
    }

    /// Shorthand for `kind() == ErrorKind::NodeExists`.
    pub fn is_node_exists(&self) -> bool {
        self.kind() == ErrorKind::NodeExists
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fail with the response's error kind unless its code is Ok.
pub fn validate(response: Response) -> Result<Response> {
    if response.code.is_ok() {
        Ok(response)
    } else {
        Err(Error::from_code(response.code, response.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_round_trip() {
        for code in [0, -4, -9, -101, -103, -110, -111, -112] {
            assert_eq!(ResultCode::from_i32(code).as_i32(), code);
            assert!(!matches!(ResultCode::from_i32(code), ResultCode::Unknown(_)));
        }
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        let code = ResultCode::from_i32(-108);
        assert_eq!(code, ResultCode::Unknown(-108));
        assert_eq!(code.error_kind(), Some(ErrorKind::Unknown(-108)));
    }

    #[test]
    fn test_validate_passes_ok_through() {
        let response = Response::new(ResultCode::Ok, "/a").with_data(b"x".to_vec());
        let validated = validate(response.clone()).unwrap();
        assert_eq!(validated, response);
    }

    #[test]
    fn test_validate_maps_failure_kind() {
        let err = validate(Response::new(ResultCode::NoNode, "/missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoNode);
        assert!(err.is_no_node());
        assert_eq!(err.to_string(), "no node for path '/missing'");

        let err = validate(Response::new(ResultCode::NotEmpty, "/a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotEmpty);
    }

    #[test]
    fn test_closed_is_invalid_state() {
        assert_eq!(Error::Closed.kind(), ErrorKind::InvalidState);
    }
}
