use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CafeteriaError, Result};

pub const DB_FILE: &str = "cafeteria.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub cafeteria_name: String,
    #[serde(default = "default_max_amount")]
    pub default_max_amount: f64,
}

fn default_max_amount() -> f64 {
    100.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            cafeteria_name: String::new(),
            default_max_amount: default_max_amount(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cafeteria")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("cafeteria")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("ignoring unreadable settings at {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CafeteriaError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

/// Database path: the `--db` override when given, otherwise `<data_dir>/cafeteria.db`.
pub fn resolve_db_path(db_override: Option<&str>) -> PathBuf {
    match db_override {
        Some(path) => PathBuf::from(shellexpand_path(path)),
        None => load_settings().db_path(),
    }
}

/// Export directory: next to an overridden database, otherwise `<data_dir>/exports`.
pub fn resolve_exports_dir(db_override: Option<&str>) -> PathBuf {
    match db_override {
        Some(path) => PathBuf::from(shellexpand_path(path))
            .parent()
            .map(|p| p.join("exports"))
            .unwrap_or_else(|| PathBuf::from("exports")),
        None => load_settings().exports_dir(),
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            cafeteria_name: "Cafetería Central".to_string(),
            default_max_amount: 250.0,
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.cafeteria_name, "Cafetería Central");
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.default_max_amount, 250.0);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.cafeteria_name.is_empty());
        assert_eq!(s.default_max_amount, 100.0);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.default_max_amount, 100.0);
        assert!(s.cafeteria_name.is_empty());
    }

    #[test]
    fn test_paths_derive_from_data_dir() {
        let s = Settings {
            data_dir: "/srv/cafe".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.db_path(), PathBuf::from("/srv/cafe/cafeteria.db"));
        assert_eq!(s.exports_dir(), PathBuf::from("/srv/cafe/exports"));
    }

    #[test]
    fn test_exports_dir_sits_next_to_db_override() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cafe.db");
        let exports = resolve_exports_dir(Some(db.to_str().unwrap()));
        assert_eq!(exports.file_name().unwrap(), "exports");
        assert_eq!(resolve_db_path(Some(db.to_str().unwrap())), db);
    }
}
