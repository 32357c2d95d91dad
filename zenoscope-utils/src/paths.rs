//! Path utilities for zenoscope
//!
//! Handles XDG Base Directory specification compliance for config, state,
//! and log directories.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application identifier for XDG directories
const APP_NAME: &str = "zenoscope";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/zenoscope` or `~/.config/zenoscope`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/zenoscope/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/zenoscope` or `~/.local/state/zenoscope`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/zenoscope/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_is_toml() {
        let path = config_file();
        assert!(path.to_string_lossy().ends_with(".toml"));
    }

    #[test]
    fn test_config_file_in_config_dir() {
        assert!(config_file().starts_with(config_dir()));
    }

    #[test]
    fn test_log_dir_is_under_state() {
        assert!(log_dir().starts_with(state_dir()));
    }

    #[test]
    fn test_all_paths_contain_app_name() {
        for path in [config_dir(), config_file(), state_dir(), log_dir()] {
            assert!(
                path.to_string_lossy().contains("zenoscope"),
                "Path should contain 'zenoscope': {:?}",
                path
            );
        }
    }

    #[test]
    fn test_ensure_dir_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("nested").join("deep");

        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_already_exists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().to_path_buf();

        assert!(ensure_dir(&test_dir).is_ok());
    }
}
