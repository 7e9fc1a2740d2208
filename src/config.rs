//! User settings shared by the CLI and the GUI.
//!
//! Stored as `key=value` lines in `~/.card-insights.conf`. Filter selections
//! are deliberately not part of it.

use crate::view::{ViewOptions, DEFAULT_TOP_N, TASK_URL_BASE};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Folder holding the local collection of exports when none is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Folder whose CSV files make up the local collection.
    pub data_dir: PathBuf,
    pub top_n: usize,
    pub task_url_base: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            top_n: DEFAULT_TOP_N,
            task_url_base: TASK_URL_BASE.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Parse settings; unknown keys and bad values fall back to defaults.
    pub fn parse(content: &str) -> Self {
        let mut config = DashboardConfig::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "data_dir" if !value.is_empty() => config.data_dir = PathBuf::from(value),
                "top_n" => match value.parse::<usize>() {
                    Ok(n) if n > 0 => config.top_n = n,
                    _ => log::warn!("Ignoring invalid top_n value '{}'", value),
                },
                "task_url_base" if !value.is_empty() => {
                    config.task_url_base = value.to_string()
                }
                other => log::debug!("Ignoring config key '{}'", other),
            }
        }

        config
    }

    pub fn to_file_string(&self) -> String {
        format!(
            "data_dir={}\ntop_n={}\ntask_url_base={}\n",
            self.data_dir.display(),
            self.top_n,
            self.task_url_base
        )
    }

    /// Load from a file, or defaults if it cannot be read.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Load from the per-user config file.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_file_string())
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path().ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
        self.save_to(&path)
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            top_n: self.top_n,
            task_url_base: self.task_url_base.clone(),
        }
    }
}

/// Get the config file path: ~/.card-insights.conf
pub fn config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".card-insights.conf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::parse("");
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.top_n, 10);
        assert_eq!(config.task_url_base, "https://app.clickup.com/t/");
    }

    #[test]
    fn test_parse_values() {
        let config = DashboardConfig::parse(
            "# settings\ndata_dir = /srv/exports\ntop_n=5\ntask_url_base=https://x/t/\nunknown=1\n",
        );
        assert_eq!(config.data_dir, PathBuf::from("/srv/exports"));
        assert_eq!(config.top_n, 5);
        assert_eq!(config.task_url_base, "https://x/t/");
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = DashboardConfig::parse("top_n=zero\ntop_n=0\ndata_dir=\nnot a pair\n");
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.conf");
        let config = DashboardConfig {
            data_dir: dir.path().join("exports"),
            top_n: 3,
            task_url_base: "https://tasks.example/".to_string(),
        };
        config.save_to(&path).unwrap();
        assert_eq!(DashboardConfig::load_from(&path), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::load_from(&dir.path().join("absent.conf"));
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_view_options() {
        let options = DashboardConfig::default().view_options();
        assert_eq!(options, ViewOptions::default());
    }
}
