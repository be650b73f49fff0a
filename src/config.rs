//! Configuration loading and discovery for `aseprite-mcp.toml`
//!
//! The config file is optional; every field has a default. The Aseprite
//! executable path can also come from the `ASEPRITE_PATH` environment
//! variable, which takes precedence over the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Name of the config file searched for by `find_config`.
pub const CONFIG_FILE_NAME: &str = "aseprite-mcp.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse {CONFIG_FILE_NAME}: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Runtime configuration for the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the Aseprite executable. This is the only binary the
    /// executor will ever spawn.
    pub aseprite_path: PathBuf,

    /// Directory roots that routed files may be written under. Empty
    /// means any destination is accepted (after traversal checks).
    pub allowed_roots: Vec<PathBuf>,

    /// Wall-clock budget for a single Aseprite invocation, in seconds.
    pub timeout_secs: u64,

    /// Extra attempts after a timed-out or transiently failed spawn.
    pub max_retries: u32,

    /// Free-space floor used by directory validation, in megabytes.
    pub min_free_space_mb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            aseprite_path: PathBuf::from("aseprite"),
            allowed_roots: Vec::new(),
            timeout_secs: 30,
            max_retries: 2,
            min_free_space_mb: 100,
        }
    }
}

impl Config {
    /// Load configuration: discovered file (if any) with env overrides
    /// applied on top.
    pub fn load() -> Result<Config, ConfigError> {
        let mut config = match find_config() {
            Some(path) => Config::from_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Apply environment variable overrides (`ASEPRITE_PATH`).
    pub fn apply_env(&mut self) {
        if let Ok(path) = env::var("ASEPRITE_PATH") {
            if !path.is_empty() {
                self.aseprite_path = PathBuf::from(path);
            }
        }
    }
}

/// Find `aseprite-mcp.toml` by walking up from the current directory,
/// falling back to `$XDG_CONFIG_HOME/aseprite-mcp/` (or `~/.config/...`).
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }
    find_xdg_config()
}

/// Find the config file by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let candidate = xdg_config.join("aseprite-mcp").join(CONFIG_FILE_NAME);
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert_eq!(c.aseprite_path, PathBuf::from("aseprite"));
        assert_eq!(c.timeout_secs, 30);
        assert_eq!(c.max_retries, 2);
        assert!(c.allowed_roots.is_empty());
    }

    #[test]
    fn parses_partial_toml() {
        let c: Config = toml::from_str(
            r#"
            aseprite_path = "/opt/aseprite/bin/aseprite"
            timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(c.aseprite_path, PathBuf::from("/opt/aseprite/bin/aseprite"));
        assert_eq!(c.timeout_secs, 60);
        assert_eq!(c.max_retries, 2);
    }

    #[test]
    fn rejects_unknown_fields() {
        let r: Result<Config, _> = toml::from_str("asperite_path = \"typo\"");
        assert!(r.is_err());
    }

    #[test]
    fn parses_allowed_roots() {
        let c: Config = toml::from_str(r#"allowed_roots = ["/srv/exports", "/tmp"]"#).unwrap();
        assert_eq!(c.allowed_roots.len(), 2);
    }
}
