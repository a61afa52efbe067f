//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use ft_core::ConsolidationConfig;

/// First day scanned for day logs when nothing else is configured.
pub const DEFAULT_HISTORY_START: i32 = 20_200_101;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `YYYYMMDD.csv` day logs.
    pub data_dir: PathBuf,
    /// Preferences document. Defaults to `preferences.json` in `data_dir`.
    pub preferences_path: Option<PathBuf>,
    /// First day id scanned for day logs.
    pub history_start: i32,
    pub consolidation: ConsolidationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs_data_path().unwrap_or_else(|| PathBuf::from(".")),
            preferences_path: None,
            history_start: DEFAULT_HISTORY_START,
            consolidation: ConsolidationConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // FT_DATA_DIR, FT_CONSOLIDATION__IDLE_CUTOFF_SECS, ...
        figment = figment.merge(Env::prefixed("FT_").split("__"));

        figment.extract()
    }

    /// Resolved location of the preferences document.
    pub fn preferences_file(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("preferences.json"))
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_ft() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ft");
    }

    #[test]
    fn test_preferences_default_to_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/data/ft"),
            ..Config::default()
        };
        assert_eq!(
            config.preferences_file(),
            PathBuf::from("/data/ft/preferences.json")
        );
    }

    #[test]
    fn test_explicit_preferences_path_wins() {
        let config = Config {
            preferences_path: Some(PathBuf::from("/etc/ft/prefs.json")),
            ..Config::default()
        };
        assert_eq!(
            config.preferences_file(),
            PathBuf::from("/etc/ft/prefs.json")
        );
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "data_dir = \"/logs\"\nhistory_start = 20240101\n\n[consolidation]\nidle_cutoff_secs = 60\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/logs"));
        assert_eq!(config.history_start, 20_240_101);
        assert_eq!(config.consolidation.idle_cutoff_secs, 60);
        assert_eq!(config.consolidation.gap_threshold_secs, 15);
    }
}
