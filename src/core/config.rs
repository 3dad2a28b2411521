/*
 * Persists the small key-value UI state that a browser front-end would keep in
 * local storage: explorer panel width and collapse flag, the active tab, the theme
 * preference and the list of pinned folders, plus the exclude patterns applied
 * when scanning. Settings are stored as one JSON file in the per-user local
 * configuration directory.
 *
 * `SettingsManagerOperations` abstracts storage so callers can be tested with
 * mocks. `CoreSettingsManager` resolves its directory through `path_utils`, or
 * uses an explicit directory when constructed with `in_dir`.
 */
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

pub const SETTINGS_FILENAME: &str = "ui_settings.json";
pub const DEFAULT_PANEL_WIDTH: u32 = 300;

#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        SettingsError::Io(err)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Serde(err)
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "Settings I/O error: {e}"),
            SettingsError::Serde(e) => write!(f, "Settings file is not valid JSON: {e}"),
            SettingsError::NoConfigDirectory => {
                write!(f, "Could not determine configuration directory for settings")
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Serde(e) => Some(e),
            SettingsError::NoConfigDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub panel_width: u32,
    pub panel_collapsed: bool,
    pub active_tab: String,
    pub theme: Theme,
    pub pinned_folders: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for UiSettings {
    fn default() -> Self {
        UiSettings {
            panel_width: DEFAULT_PANEL_WIDTH,
            panel_collapsed: false,
            active_tab: "chat".to_string(),
            theme: Theme::default(),
            pinned_folders: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl UiSettings {
    /* Pins a folder. Returns false if it was already pinned. */
    pub fn pin_folder(&mut self, folder: &str) -> bool {
        if self.is_pinned(folder) {
            return false;
        }
        self.pinned_folders.push(folder.to_string());
        true
    }

    /* Unpins a folder. Returns false if it was not pinned. */
    pub fn unpin_folder(&mut self, folder: &str) -> bool {
        let before = self.pinned_folders.len();
        self.pinned_folders.retain(|f| f != folder);
        self.pinned_folders.len() != before
    }

    pub fn is_pinned(&self, folder: &str) -> bool {
        self.pinned_folders.iter().any(|f| f == folder)
    }
}

pub trait SettingsManagerOperations: Send + Sync {
    fn load_settings(&self, app_name: &str) -> Result<UiSettings>;
    fn save_settings(&self, app_name: &str, settings: &UiSettings) -> Result<()>;
}

pub struct CoreSettingsManager {
    dir_override: Option<PathBuf>,
}

impl CoreSettingsManager {
    pub fn new() -> Self {
        CoreSettingsManager { dir_override: None }
    }

    /* Stores settings in `dir` instead of the per-user configuration directory. */
    pub fn in_dir(dir: PathBuf) -> Self {
        CoreSettingsManager {
            dir_override: Some(dir),
        }
    }

    fn settings_path(&self, app_name: &str) -> Result<PathBuf> {
        let dir = match &self.dir_override {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => path_utils::get_base_app_config_local_dir(app_name)
                .ok_or(SettingsError::NoConfigDirectory)?,
        };
        Ok(dir.join(SETTINGS_FILENAME))
    }
}

impl Default for CoreSettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsManagerOperations for CoreSettingsManager {
    /*
     * Loads settings for `app_name`. A missing file yields defaults; fields absent
     * from an older file take their default values.
     */
    fn load_settings(&self, app_name: &str) -> Result<UiSettings> {
        let file_path = self.settings_path(app_name)?;
        if !file_path.exists() {
            log::debug!("CoreSettingsManager: No settings at {file_path:?}; using defaults.");
            return Ok(UiSettings::default());
        }
        let reader = BufReader::new(File::open(&file_path)?);
        let settings: UiSettings = serde_json::from_reader(reader)?;
        log::debug!("CoreSettingsManager: Loaded settings from {file_path:?}.");
        Ok(settings)
    }

    fn save_settings(&self, app_name: &str, settings: &UiSettings) -> Result<()> {
        let file_path = self.settings_path(app_name)?;
        let mut writer = BufWriter::new(File::create(&file_path)?);
        serde_json::to_writer_pretty(&mut writer, settings)?;
        writer.flush()?;
        log::debug!("CoreSettingsManager: Saved settings to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_without_file_returns_defaults() {
        // Arrange
        crate::initialize_logging();
        let dir = tempdir().unwrap();
        let manager = CoreSettingsManager::in_dir(dir.path().to_path_buf());

        // Act
        let settings = manager.load_settings("AnyApp").unwrap();

        // Assert
        assert_eq!(settings, UiSettings::default());
        assert_eq!(settings.panel_width, DEFAULT_PANEL_WIDTH);
        assert_eq!(settings.theme, Theme::System);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = tempdir().unwrap();
        let manager = CoreSettingsManager::in_dir(dir.path().to_path_buf());
        let mut settings = UiSettings {
            panel_width: 420,
            panel_collapsed: true,
            active_tab: "files".to_string(),
            theme: Theme::Dark,
            ..UiSettings::default()
        };
        settings.pin_folder("/work/project");

        manager.save_settings("AnyApp", &settings).unwrap();
        let loaded = manager.load_settings("AnyApp").unwrap();

        assert_eq!(loaded, settings);
        let raw = fs::read_to_string(dir.path().join(SETTINGS_FILENAME)).unwrap();
        assert!(raw.contains("\"dark\""));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), r#"{"theme": "light"}"#).unwrap();
        let manager = CoreSettingsManager::in_dir(dir.path().to_path_buf());

        let loaded = manager.load_settings("AnyApp").unwrap();

        assert_eq!(loaded.theme, Theme::Light);
        assert_eq!(loaded.panel_width, DEFAULT_PANEL_WIDTH);
        assert_eq!(loaded.active_tab, "chat");
    }

    #[test]
    fn test_corrupt_file_is_a_serde_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "{ not json").unwrap();
        let manager = CoreSettingsManager::in_dir(dir.path().to_path_buf());

        match manager.load_settings("AnyApp") {
            Err(SettingsError::Serde(_)) => {}
            other => panic!("Expected a serde error, got {other:?}"),
        }
    }

    #[test]
    fn test_pinning_is_deduplicated_and_ordered() {
        let mut settings = UiSettings::default();

        assert!(settings.pin_folder("b"));
        assert!(settings.pin_folder("a"));
        assert!(!settings.pin_folder("b"));
        assert_eq!(settings.pinned_folders, vec!["b", "a"]);

        assert!(settings.unpin_folder("b"));
        assert!(!settings.unpin_folder("b"));
        assert!(!settings.is_pinned("b"));
        assert!(settings.is_pinned("a"));
    }

    #[test]
    fn test_core_settings_manager_uses_app_config_dir() {
        let unique_app_name = format!("TestApp_Settings_{}", rand::random::<u64>());
        let manager = CoreSettingsManager::new();
        let mut settings = UiSettings::default();
        settings.pin_folder("/tmp/pinned");

        manager.save_settings(&unique_app_name, &settings).unwrap();
        let loaded = manager.load_settings(&unique_app_name).unwrap();

        assert_eq!(loaded.pinned_folders, vec!["/tmp/pinned"]);
        if let Some(dir) = path_utils::get_base_app_config_local_dir(&unique_app_name) {
            if let Err(e) = fs::remove_dir_all(&dir) {
                eprintln!("Test cleanup failed for {dir:?}: {e}");
            }
        }
    }
}
