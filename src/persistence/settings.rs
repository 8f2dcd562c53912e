use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::xml_codec::ImportMode;
use crate::tables::labels::Locale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // Falls back to the platform state directory
    pub autosave_override: Option<PathBuf>,
    // Falls back to a folder under the system temp dir
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    // Language of relationship labels in the tables
    #[serde(default)]
    pub locale: Locale,
    // Whether an imported diagram joins the canvas or replaces it
    #[serde(default)]
    pub import_mode: ImportMode,
    #[serde(default = "AppSettings::default_autosave_on_exit")]
    pub autosave_on_exit: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autosave_override: None,
            export_override: None,
            locale: Locale::default(),
            import_mode: ImportMode::default(),
            autosave_on_exit: Self::default_autosave_on_exit(),
        }
    }
}

const APP_DIR: &str = "Diagram-Loom";
const SETTINGS_JSON: &str = "settings.json";
const SETTINGS_RON: &str = "settings.ron";

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"))
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    let mut text = String::new();
    fs::File::open(path)?.read_to_string(&mut text)?;
    Ok(text)
}

impl AppSettings {
    /// Per-user preferences directory for this platform.
    fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            return env_dir("APPDATA").map(|d| d.join(APP_DIR)).unwrap_or_else(|| PathBuf::from(APP_DIR));
        }
        if cfg!(target_os = "macos") {
            return home_dir().join("Library/Application Support").join(APP_DIR);
        }
        env_dir("XDG_CONFIG_HOME")
            .unwrap_or_else(|| home_dir().join(".config"))
            .join(APP_DIR)
    }

    /// Where state.ron lands unless the user picked a directory.
    fn autosave_default_dir() -> PathBuf {
        let fallback = || std::env::temp_dir().join(APP_DIR);
        if cfg!(target_os = "windows") {
            return env_dir("LOCALAPPDATA").map(|d| d.join(APP_DIR).join("Autosave")).unwrap_or_else(fallback);
        }
        if let Some(state) = env_dir("XDG_STATE_HOME") {
            return state.join("diagram-loom");
        }
        env_dir("HOME")
            .map(|home| home.join(".local/state/diagram-loom"))
            .unwrap_or_else(fallback)
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir())
    }

    /// Read preferences from `dir`.
    ///
    /// `settings.json` wins. An older `settings.ron` is read once and rewritten
    /// as JSON; a failed rewrite only costs the migration, not the load.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let json_path = dir.join(SETTINGS_JSON);
        if json_path.exists() {
            return Ok(serde_json::from_str(&read_text(&json_path)?)?);
        }
        let ron_path = dir.join(SETTINGS_RON);
        if ron_path.exists() {
            let legacy: Self = ron::from_str(&read_text(&ron_path)?)?;
            let _ = legacy.save_to(dir);
            return Ok(legacy);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_dir())
    }

    pub fn save_to(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let body = serde_json::to_string_pretty(self)?;
        fs::File::create(dir.join(SETTINGS_JSON))?.write_all(body.as_bytes())?;
        Ok(())
    }

    pub fn autosave_dir(&self) -> PathBuf {
        self.autosave_override.clone().unwrap_or_else(Self::autosave_default_dir)
    }

    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    /// Exports fall back to a scratch folder under the system temp dir.
    pub fn export_default_dir() -> PathBuf {
        std::env::temp_dir().join(APP_DIR).join("exports")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_override.clone().unwrap_or_else(Self::export_default_dir)
    }

    pub(crate) fn default_autosave_on_exit() -> bool { true }
}
