use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
  #[default]
  #[serde(rename = "en")]
  En,
  #[serde(rename = "en-sw")]
  EnSw,
  #[serde(rename = "sw")]
  Sw,
}

impl Language {
  pub fn parse(value: &str) -> Result<Self, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
      "en" => Ok(Language::En),
      "en-sw" => Ok(Language::EnSw),
      "sw" => Ok(Language::Sw),
      _ => Err(AppError::new("INVALID_LANGUAGE", "Language must be en, en-sw or sw")),
    }
  }

  pub fn display_name(self, name_en: &str, name_sw: &str) -> String {
    match self {
      Language::En => name_en.to_string(),
      Language::EnSw => format!("{name_sw} ({name_en})"),
      Language::Sw => name_sw.to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub language: Language,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsInput {
  pub language: String,
}

impl SettingsInput {
  pub fn validate(&self) -> Result<Settings, AppError> {
    Ok(Settings {
      language: Language::parse(&self.language)?,
    })
  }
}

/// Installation-wide preferences persisted next to the data.
pub struct SettingsStore {
  path: PathBuf,
  current: Mutex<Settings>,
}

impl SettingsStore {
  pub fn open(data_dir: &Path) -> Self {
    let path = data_dir.join(SETTINGS_FILE);
    let current = load_settings(&path);
    Self {
      path,
      current: Mutex::new(current),
    }
  }

  pub fn get(&self) -> Result<Settings, AppError> {
    Ok(self.current.lock()?.clone())
  }

  pub fn update(&self, settings: Settings) -> Result<Settings, AppError> {
    let mut current = self.current.lock()?;
    save_settings(&self.path, &settings)?;
    *current = settings.clone();
    Ok(settings)
  }
}

fn load_settings(path: &Path) -> Settings {
  let data = match fs::read_to_string(path) {
    Ok(data) => data,
    Err(_) => return Settings::default(),
  };
  match serde_json::from_str::<Settings>(&data) {
    Ok(settings) => settings,
    Err(err) => {
      warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
      Settings::default()
    }
  }
}

fn save_settings(path: &Path, settings: &Settings) -> Result<(), AppError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let data = serde_json::to_string_pretty(settings)?;
  fs::write(path, data)?;
  Ok(())
}
