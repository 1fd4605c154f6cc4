use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use home_ledger::config::AppConfig;
use home_ledger::error::AppError;
use home_ledger::{server, AppState};

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  match run() {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!(code = %err.code, message = %err.message, "home ledger stopped");
      ExitCode::FAILURE
    }
  }
}

fn run() -> Result<(), AppError> {
  let config = AppConfig::from_env()?;
  let state = AppState::open(&config)?;
  server::serve(&config, &state)
}
