use std::fs;
use std::path::PathBuf;

use crate::error::AppError;

const ENV_DATA_DIR: &str = "HOME_LEDGER_DATA_DIR";
const ENV_PORTABLE: &str = "HOME_LEDGER_PORTABLE";
const ENV_BIND: &str = "HOME_LEDGER_BIND";
const ENV_PORT: &str = "HOME_LEDGER_PORT";
const ENV_BACKEND: &str = "HOME_LEDGER_BACKEND";

const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 48090;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
  Sqlite,
  Json,
}

impl Backend {
  pub fn parse(value: &str) -> Result<Self, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
      "sqlite" => Ok(Backend::Sqlite),
      "json" => Ok(Backend::Json),
      other => Err(AppError::new("CONFIG", format!("Unknown backend '{other}' (sqlite or json)"))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub data_dir: PathBuf,
  pub bind: String,
  pub port: u16,
  pub backend: Backend,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, AppError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Resolves the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
    let data_dir = match lookup(ENV_DATA_DIR).filter(|value| !value.trim().is_empty()) {
      Some(dir) => PathBuf::from(dir),
      None => resolve_app_dir(is_truthy(lookup(ENV_PORTABLE).as_deref()))?,
    };

    let bind = lookup(ENV_BIND)
      .map(|value| value.trim().to_string())
      .filter(|value| !value.is_empty())
      .unwrap_or_else(|| DEFAULT_BIND.to_string());

    let port = match lookup(ENV_PORT) {
      Some(value) => value
        .trim()
        .parse::<u16>()
        .map_err(|_| AppError::new("CONFIG", format!("{ENV_PORT} must be a port number, got '{value}'")))?,
      None => DEFAULT_PORT,
    };

    let backend = match lookup(ENV_BACKEND) {
      Some(value) => Backend::parse(&value)?,
      None => Backend::Sqlite,
    };

    Ok(Self {
      data_dir,
      bind,
      port,
      backend,
    })
  }
}

fn is_truthy(value: Option<&str>) -> bool {
  value
    .map(|value| {
      let value = value.to_ascii_lowercase();
      value == "1" || value == "true" || value == "yes"
    })
    .unwrap_or(false)
}

fn resolve_app_dir(portable_requested: bool) -> Result<PathBuf, AppError> {
  if let Some(portable) = resolve_portable_dir(portable_requested)? {
    return Ok(portable);
  }

  let base = dirs_next::data_local_dir()
    .ok_or_else(|| AppError::new("CONFIG", "No local data directory available"))?;
  Ok(base.join("HomeLedger"))
}

fn resolve_portable_dir(portable_requested: bool) -> Result<Option<PathBuf>, AppError> {
  let exe_dir = std::env::current_exe()
    .ok()
    .and_then(|path| path.parent().map(|parent| parent.to_path_buf()));

  if let Some(exe_dir) = exe_dir {
    let data_dir = exe_dir.join("data");
    if portable_requested || data_dir.exists() {
      fs::create_dir_all(&data_dir)?;
      return Ok(Some(data_dir));
    }
  }

  Ok(None)
}
