pub mod commands;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod reports;
pub mod server;
pub mod settings;
pub mod store;

use config::{AppConfig, Backend};
use error::AppError;
use settings::SettingsStore;
use store::{JsonStore, RecordStore, SqliteStore};

pub struct AppState {
  pub store: Box<dyn RecordStore>,
  pub settings: SettingsStore,
}

impl AppState {
  pub fn open(config: &AppConfig) -> Result<Self, AppError> {
    let store: Box<dyn RecordStore> = match config.backend {
      Backend::Sqlite => Box::new(SqliteStore::open(&config.data_dir)?),
      Backend::Json => Box::new(JsonStore::open(&config.data_dir)?),
    };
    Ok(Self {
      store,
      settings: SettingsStore::open(&config.data_dir),
    })
  }
}
