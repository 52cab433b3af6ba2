use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::Settings;

const CONFIG_DIR: &str = "cs2_terminal";
const SETTINGS_FILE: &str = "settings.json";
const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SettingsFile {
    version: u32,
    settings: Settings,
}

/// Best-effort load. A missing, corrupt, or version-mismatched file just
/// yields defaults; the user re-enters their values.
pub fn load() -> Settings {
    let Some(path) = settings_path() else {
        return Settings::default();
    };
    let Ok(raw) = fs::read_to_string(&path) else {
        return Settings::default();
    };
    let Ok(file) = serde_json::from_str::<SettingsFile>(&raw) else {
        return Settings::default();
    };
    if file.version != SETTINGS_VERSION {
        return Settings::default();
    }
    file.settings
}

pub fn save(settings: &Settings) {
    let Some(path) = settings_path() else {
        return;
    };
    let Some(dir) = path.parent() else {
        return;
    };
    let _ = fs::create_dir_all(dir);

    let file = SettingsFile {
        version: SETTINGS_VERSION,
        settings: settings.clone(),
    };
    if let Ok(json) = serde_json::to_string_pretty(&file) {
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, &path);
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    // Prefer XDG config.
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CONFIG_DIR).join(SETTINGS_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(SETTINGS_FILE),
    )
}
