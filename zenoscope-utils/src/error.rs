//! Error types for zenoscope
//!
//! Provides a unified error type used across the zenoscope crates.

use std::path::PathBuf;

/// Main error type for zenoscope operations
#[derive(Debug, thiserror::Error)]
pub enum ZenoscopeError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(String),

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Bus Errors ===

    #[error("Bus session error: {0}")]
    Bus(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ZenoscopeError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a bus error
    pub fn bus(msg: impl Into<String>) -> Self {
        Self::Bus(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using ZenoscopeError
pub type Result<T> = std::result::Result<T, ZenoscopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ZenoscopeError::Connection("refused".into());
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ZenoscopeError::FileRead {
            path: PathBuf::from("/etc/zenoscope.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/zenoscope.toml"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = ZenoscopeError::ConfigInvalid {
            path: PathBuf::from("config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ZenoscopeError = io_err.into();
        assert!(matches!(err, ZenoscopeError::Io(_)));
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(
            ZenoscopeError::connection("x"),
            ZenoscopeError::Connection(_)
        ));
        assert!(matches!(
            ZenoscopeError::protocol("x"),
            ZenoscopeError::Protocol(_)
        ));
        assert!(matches!(
            ZenoscopeError::config("x"),
            ZenoscopeError::Config(_)
        ));
        assert!(matches!(ZenoscopeError::bus("x"), ZenoscopeError::Bus(_)));
        assert!(matches!(
            ZenoscopeError::internal("x"),
            ZenoscopeError::Internal(_)
        ));
    }

    #[test]
    fn test_result_alias() {
        let ok: Result<u32> = Ok(7);
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u32> = Err(ZenoscopeError::ConnectionClosed);
        assert!(err.is_err());
    }
}
