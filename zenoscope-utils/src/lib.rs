//! zenoscope-utils: Shared support code for the zenoscope binaries
//!
//! Provides the unified error type, logging setup, and XDG path helpers
//! used by both the gateway daemon and the MCP server.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Result, ZenoscopeError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};
pub use paths::{config_dir, config_file, ensure_dir, log_dir, state_dir};
