use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{authenticated, build_record, merge_missing, FinanceStore, Outcome, TaskLogStore};
use crate::db::{self, Db};
use crate::error::AppError;
use crate::models::{
  remove_log, upsert_log, DailyProgress, FinanceRecord, FinanceType, LogKey, NewFinanceRecord, TaskLog,
  UserId,
};

pub struct SqliteStore {
  db: Db,
}

impl SqliteStore {
  pub fn open(data_dir: &Path) -> Result<Self, AppError> {
    Ok(Self {
      db: db::init_db(data_dir)?,
    })
  }

  pub fn in_memory() -> Result<Self, AppError> {
    Ok(Self {
      db: db::init_in_memory()?,
    })
  }

  /// Runs a read-modify-write of one (user, date) row under a write lock so
  /// concurrent writers never lose each other's logs.
  fn modify_day(
    &self,
    user: &UserId,
    date: NaiveDate,
    apply: impl FnOnce(&mut Vec<TaskLog>) -> bool,
  ) -> Result<DailyProgress, AppError> {
    db::with_conn(&self.db, |conn| {
      let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
      let mut logs = load_logs(&tx, user, date)?.unwrap_or_default();
      if !apply(&mut logs) {
        tx.commit()?;
        return DailyProgress::from_logs(date, logs);
      }
      let progress = DailyProgress::from_logs(date, logs)?;

      if progress.logs.is_empty() {
        tx.execute(
          "DELETE FROM daily_progress WHERE user_id = ?1 AND date = ?2",
          params![user.as_str(), date.to_string()],
        )?;
      } else {
        tx.execute(
          "INSERT INTO daily_progress (user_id, date, total_points, logs, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(user_id, date) DO UPDATE SET
             total_points = excluded.total_points,
             logs = excluded.logs,
             updated_at = excluded.updated_at",
          params![
            user.as_str(),
            date.to_string(),
            progress.total_points,
            serde_json::to_string(&progress.logs)?,
            Utc::now().to_rfc3339()
          ],
        )?;
      }
      tx.commit()?;
      debug!(user = %user, %date, logs = progress.logs.len(), "daily progress written");
      Ok(progress)
    })
  }
}

fn load_logs(conn: &Connection, user: &UserId, date: NaiveDate) -> Result<Option<Vec<TaskLog>>, AppError> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT logs FROM daily_progress WHERE user_id = ?1 AND date = ?2",
      params![user.as_str(), date.to_string()],
      |row| row.get(0),
    )
    .optional()?;
  match raw {
    Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
    None => Ok(None),
  }
}

fn parse_stored_date(value: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .map_err(|_| AppError::new("STORE_CORRUPT", format!("Stored date '{value}' is not YYYY-MM-DD")))
}

impl TaskLogStore for SqliteStore {
  fn save_log(&self, user: Option<&UserId>, log: TaskLog) -> Result<Outcome<DailyProgress>, AppError> {
    let Some(user) = authenticated(user, "save_log") else {
      return Ok(Outcome::Unauthenticated);
    };
    let date = log.date;
    let progress = self.modify_day(user, date, |logs| {
      upsert_log(logs, log);
      true
    })?;
    Ok(Outcome::Done(progress))
  }

  fn remove_log(&self, user: Option<&UserId>, key: &LogKey) -> Result<Outcome<DailyProgress>, AppError> {
    let Some(user) = authenticated(user, "remove_log") else {
      return Ok(Outcome::Unauthenticated);
    };
    let progress = self.modify_day(user, key.date, |logs| remove_log(logs, key))?;
    Ok(Outcome::Done(progress))
  }

  fn add_missing_logs(
    &self,
    user: Option<&UserId>,
    date: NaiveDate,
    candidates: Vec<TaskLog>,
  ) -> Result<Outcome<(DailyProgress, Vec<TaskLog>)>, AppError> {
    let Some(user) = authenticated(user, "add_missing_logs") else {
      return Ok(Outcome::Unauthenticated);
    };
    let mut added = Vec::new();
    let progress = self.modify_day(user, date, |logs| {
      added = merge_missing(logs, date, candidates);
      !added.is_empty()
    })?;
    Ok(Outcome::Done((progress, added)))
  }

  fn logs_for_date(&self, user: Option<&UserId>, date: NaiveDate) -> Result<Outcome<Vec<TaskLog>>, AppError> {
    let Some(user) = authenticated(user, "logs_for_date") else {
      return Ok(Outcome::Unauthenticated);
    };
    let logs = db::with_conn(&self.db, |conn| load_logs(conn, user, date))?;
    Ok(Outcome::Done(logs.unwrap_or_default()))
  }

  fn daily_progress(&self, user: Option<&UserId>, date: NaiveDate) -> Result<Outcome<Option<DailyProgress>>, AppError> {
    let Some(user) = authenticated(user, "daily_progress") else {
      return Ok(Outcome::Unauthenticated);
    };
    let logs = db::with_conn(&self.db, |conn| load_logs(conn, user, date))?;
    let progress = logs.map(|logs| DailyProgress::from_logs(date, logs)).transpose()?;
    Ok(Outcome::Done(progress))
  }

  fn all_progress(&self, user: Option<&UserId>) -> Result<Outcome<Vec<DailyProgress>>, AppError> {
    let Some(user) = authenticated(user, "all_progress") else {
      return Ok(Outcome::Unauthenticated);
    };
    let rows: Vec<(String, String)> = db::with_conn(&self.db, |conn| {
      let mut stmt = conn.prepare("SELECT date, logs FROM daily_progress WHERE user_id = ?1 ORDER BY date DESC")?;
      let rows = stmt.query_map(params![user.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?;
      let mut items = Vec::new();
      for row in rows {
        items.push(row?);
      }
      Ok(items)
    })?;

    let mut days = Vec::with_capacity(rows.len());
    for (date, logs) in rows {
      let logs: Vec<TaskLog> = serde_json::from_str(&logs)?;
      days.push(DailyProgress::from_logs(parse_stored_date(&date)?, logs)?);
    }
    Ok(Outcome::Done(days))
  }

  fn log_exists(&self, user: Option<&UserId>, key: &LogKey) -> Result<Outcome<bool>, AppError> {
    let Some(user) = authenticated(user, "log_exists") else {
      return Ok(Outcome::Unauthenticated);
    };
    let logs = db::with_conn(&self.db, |conn| load_logs(conn, user, key.date))?;
    let exists = logs.map(|logs| logs.iter().any(|log| key.matches(log))).unwrap_or(false);
    Ok(Outcome::Done(exists))
  }
}

impl FinanceStore for SqliteStore {
  fn save_record(&self, user: Option<&UserId>, record: NewFinanceRecord) -> Result<Outcome<FinanceRecord>, AppError> {
    let Some(user) = authenticated(user, "save_record") else {
      return Ok(Outcome::Unauthenticated);
    };
    let record = build_record(record);
    db::with_conn(&self.db, |conn| {
      conn.execute(
        "INSERT INTO finance_records (id, user_id, type, amount, category, date, description, timestamp, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
          record.id,
          user.as_str(),
          record.kind.as_str(),
          record.amount,
          record.category,
          record.date.to_string(),
          record.description,
          record.timestamp,
          Utc::now().to_rfc3339()
        ],
      )?;
      Ok(())
    })?;
    debug!(user = %user, id = %record.id, kind = record.kind.as_str(), "finance record stored");
    Ok(Outcome::Done(record))
  }

  fn all_records(&self, user: Option<&UserId>) -> Result<Outcome<Vec<FinanceRecord>>, AppError> {
    let Some(user) = authenticated(user, "all_records") else {
      return Ok(Outcome::Unauthenticated);
    };
    type Row = (String, String, f64, String, String, Option<String>, i64);
    let rows: Vec<Row> = db::with_conn(&self.db, |conn| {
      let mut stmt = conn.prepare(
        "SELECT id, type, amount, category, date, description, timestamp
         FROM finance_records
         WHERE user_id = ?1
         ORDER BY date DESC, timestamp DESC",
      )?;
      let rows = stmt.query_map(params![user.as_str()], |row| {
        Ok((
          row.get(0)?,
          row.get(1)?,
          row.get(2)?,
          row.get(3)?,
          row.get(4)?,
          row.get(5)?,
          row.get(6)?,
        ))
      })?;
      let mut items = Vec::new();
      for row in rows {
        items.push(row?);
      }
      Ok(items)
    })?;

    let mut records = Vec::with_capacity(rows.len());
    for (id, kind, amount, category, date, description, timestamp) in rows {
      let kind = FinanceType::parse(&kind)
        .ok_or_else(|| AppError::new("STORE_CORRUPT", format!("Stored finance type '{kind}' is unknown")))?;
      records.push(FinanceRecord {
        id,
        kind,
        amount,
        category,
        date: parse_stored_date(&date)?,
        description,
        timestamp,
      });
    }
    Ok(Outcome::Done(records))
  }
}
