//! Settings and biography loading for the terminal front end.

use shared::settings::AssistantSettings;
use std::fs;
use std::path::{Path, PathBuf};

fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Folio Assistant", "FolioAssistant")
        .map(|proj| proj.config_dir().to_path_buf())
}

pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.json"))
}

/// Settings from disk, or defaults. The flag reports whether a file was read.
pub fn load_settings_or_default() -> (AssistantSettings, bool) {
    match config_path() {
        Some(path) => load_settings_from(&path),
        None => (AssistantSettings::default(), false),
    }
}

pub fn load_settings_from(path: &Path) -> (AssistantSettings, bool) {
    let Ok(contents) = fs::read_to_string(path) else {
        return (AssistantSettings::default(), false);
    };
    match serde_json::from_str::<AssistantSettings>(&contents) {
        Ok(settings) => (settings, true),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "settings file is invalid, using defaults");
            (AssistantSettings::default(), false)
        }
    }
}

/// Write the defaults out so there is a file to edit.
pub fn save_settings(settings: &AssistantSettings) {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(settings) {
            let _ = fs::write(&path, json);
        }
    }
}

/// Grounding text for the persona: the configured file, else `biography.txt`
/// next to the settings. Missing files give an empty biography.
pub fn load_biography(settings: &AssistantSettings) -> String {
    let path = settings
        .persona
        .biography_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| config_dir().map(|dir| dir.join("biography.txt")));

    let Some(path) = path else {
        return String::new();
    };
    match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "no biography loaded");
            String::new()
        }
    }
}
