//! Settings files for the relaunch tool
//!
//! Everything lives as JSON under the platform config root, in a
//! `relaunch` directory (`~/.config/relaunch/` on Linux). The binary calls
//! [`init`] once before reading Listmonk connection settings.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory under the platform config root
const APP_DIR: &str = "relaunch";

/// Create the settings directory if needed and return its path
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Settings directory, or `None` when the platform has no config root
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Path of `filename` inside the settings directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Read `filename` from the settings directory as JSON
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("No platform config directory")?;
    load_json_file(&path)
}

/// Read a JSON settings file from anywhere on disk
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read settings file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in settings file {}", path.display()))
}

/// Whether `filename` is present in the settings directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("No platform config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create settings directory {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        base_url: String,
        retries: u32,
    }

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("relaunch"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path("listmonk.json");
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("relaunch/listmonk.json"));
    }

    #[test]
    fn test_load_json_file() {
        let path = std::env::temp_dir().join(format!("relaunch-config-{}.json", std::process::id()));
        let sample = Sample {
            base_url: "http://localhost:9000".to_string(),
            retries: 3,
        };

        std::fs::write(&path, serde_json::to_string(&sample).unwrap()).unwrap();
        let loaded: Sample = load_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/nonexistent/relaunch/missing.json");
        let result: Result<Sample> = load_json_file(path);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Cannot read settings file"));
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let path = std::env::temp_dir().join(format!("relaunch-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result: Result<Sample> = load_json_file(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid JSON in settings file"));
        assert!(err.contains("relaunch-bad-"));
    }
}
