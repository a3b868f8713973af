//! Configuration management.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for shopwatch.
#[derive(Debug, Clone)]
pub struct ShopwatchConfig {
    /// Default source file to extract from.
    pub source_path: Option<PathBuf>,
    /// Default output CSV path.
    pub output_path: Option<PathBuf>,
    /// Cursor state file for resumable watch sessions.
    pub state_file: Option<PathBuf>,
    /// Debounce window for bursts of appends, in milliseconds.
    pub debounce_ms: u64,
    /// Fallback polling interval, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ShopwatchConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            output_path: None,
            state_file: None,
            debounce_ms: 200,
            poll_interval_ms: 2000,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Source file path.
    pub source_path: Option<String>,
    /// Output CSV path.
    pub output_path: Option<String>,
    /// Cursor state file path.
    pub state_file: Option<String>,
    /// Debounce window in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Polling interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
}

impl ShopwatchConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/shopwatch/` on macOS)
    /// 2. XDG config dir (`~/.config/shopwatch/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        // Check platform-specific config dir first
        let platform_config = base_dirs.config_dir().join("shopwatch").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/shopwatch/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("shopwatch")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `ShopwatchConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(source_path) = file.source_path {
            config.source_path = Some(PathBuf::from(source_path));
        }
        if let Some(output_path) = file.output_path {
            config.output_path = Some(PathBuf::from(output_path));
        }
        if let Some(state_file) = file.state_file {
            config.state_file = Some(PathBuf::from(state_file));
        }
        if let Some(debounce_ms) = file.debounce_ms {
            config.debounce_ms = debounce_ms;
        }
        if let Some(poll_interval_ms) = file.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }

        config
    }

    /// Sets the source path.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Sets the output path.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// The debounce window as a `Duration`.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The polling interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShopwatchConfig::default();
        assert_eq!(config.debounce_ms, 200);
        assert_eq!(config.poll_interval_ms, 2000);
        assert!(config.source_path.is_none());
    }

    #[test]
    fn test_from_config_file_overrides() {
        let file: ConfigFile = toml::from_str(
            r#"
            source_path = "captures.txt"
            output_path = "shops.csv"
            debounce_ms = 50
            "#,
        )
        .unwrap();
        let config = ShopwatchConfig::from_config_file(file);
        assert_eq!(config.source_path.as_deref(), Some(std::path::Path::new("captures.txt")));
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.poll_interval_ms, 2000);
    }

    #[test]
    fn test_duration_helpers() {
        let config = ShopwatchConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(200));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }
}
