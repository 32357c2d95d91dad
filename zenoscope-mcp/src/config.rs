//! MCP server configuration
//!
//! Loaded from `$XDG_CONFIG_HOME/zenoscope/config.toml` when present;
//! every field has a working default so a missing file is fine. The
//! `ZENOSCOPE_GATEWAY` environment variable overrides the gateway command.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use zenoscope_utils::{config_file, Result, ZenoscopeError};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub gateway: GatewaySection,
}

/// How to spawn and configure the gateway process
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Gateway executable; resolved via PATH when not absolute
    pub command: String,
    pub args: Vec<String>,
    /// Zenoh config file handed to the gateway via ZENOH_CONFIG
    pub zenoh_config: Option<PathBuf>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            command: "zenoscope-gateway".into(),
            args: Vec::new(),
            zenoh_config: None,
        }
    }
}

impl McpConfig {
    /// Load configuration from the default location, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let path = config_file();
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };

        if let Ok(command) = std::env::var("ZENOSCOPE_GATEWAY") {
            config.gateway.command = command;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ZenoscopeError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| ZenoscopeError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gateway.command.is_empty() {
            return Err(ZenoscopeError::config("gateway.command must not be empty"));
        }
        Ok(())
    }
}
