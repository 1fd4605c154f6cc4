use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::AppError;

pub const DB_FILE: &str = "home_ledger.sqlite";

pub struct Db {
  pub conn: Mutex<Connection>,
}

pub fn init_db(data_dir: &Path) -> Result<Db, AppError> {
  fs::create_dir_all(data_dir)?;
  let db_path = data_dir.join(DB_FILE);
  let mut conn = Connection::open(&db_path)?;
  conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
  conn.busy_timeout(Duration::from_secs(5))?;

  run_migrations(&mut conn)?;
  info!(path = %db_path.display(), "sqlite store ready");

  Ok(Db {
    conn: Mutex::new(conn),
  })
}

pub fn init_in_memory() -> Result<Db, AppError> {
  let mut conn = Connection::open_in_memory()?;
  run_migrations(&mut conn)?;
  Ok(Db {
    conn: Mutex::new(conn),
  })
}

pub fn with_conn<T>(db: &Db, f: impl FnOnce(&mut Connection) -> Result<T, AppError>) -> Result<T, AppError> {
  let mut guard = db.conn.lock()?;
  f(&mut guard)
}

fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
  conn.execute_batch(
    "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT NOT NULL)",
  )?;

  apply_migration(conn, "001_init", include_str!("../migrations/001_init.sql"))?;
  Ok(())
}

fn apply_migration(conn: &mut Connection, version: &str, sql: &str) -> Result<(), AppError> {
  let exists: i64 = conn.query_row(
    "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
    params![version],
    |row| row.get(0),
  )?;
  if exists > 0 {
    return Ok(());
  }

  let tx = conn.transaction()?;
  tx.execute_batch(sql)?;
  tx.execute(
    "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
    params![version, Utc::now().to_rfc3339()],
  )?;
  tx.commit()?;
  info!(version, "applied migration");
  Ok(())
}
