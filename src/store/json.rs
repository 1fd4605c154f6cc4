use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::{authenticated, build_record, merge_missing, sort_records, FinanceStore, Outcome, TaskLogStore};
use crate::error::AppError;
use crate::models::{remove_log, upsert_log, DailyProgress, FinanceRecord, LogKey, NewFinanceRecord, TaskLog, UserId};

const TASK_LOGS_FILE: &str = "task_logs.json";
const FINANCE_FILE: &str = "finance_records.json";

type TaskLogMap = BTreeMap<String, BTreeMap<NaiveDate, Vec<TaskLog>>>;
type FinanceMap = BTreeMap<String, Vec<FinanceRecord>>;

/// File-backed store keeping every user's data in two JSON documents.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
pub struct JsonStore {
  task_logs_path: PathBuf,
  finance_path: PathBuf,
  task_logs: Mutex<TaskLogMap>,
  finance: Mutex<FinanceMap>,
}

impl JsonStore {
  pub fn open(data_dir: &Path) -> Result<Self, AppError> {
    fs::create_dir_all(data_dir)?;
    let task_logs_path = data_dir.join(TASK_LOGS_FILE);
    let finance_path = data_dir.join(FINANCE_FILE);
    let task_logs: TaskLogMap = load_document(&task_logs_path)?;
    let finance: FinanceMap = load_document(&finance_path)?;
    info!(path = %data_dir.display(), users = task_logs.len().max(finance.len()), "json store ready");
    Ok(Self {
      task_logs_path,
      finance_path,
      task_logs: Mutex::new(task_logs),
      finance: Mutex::new(finance),
    })
  }

  fn read_day<T>(&self, user: &UserId, date: NaiveDate, f: impl FnOnce(Option<&Vec<TaskLog>>) -> T) -> Result<T, AppError> {
    let task_logs = self.task_logs.lock()?;
    let logs = task_logs.get(user.as_str()).and_then(|days| days.get(&date));
    Ok(f(logs))
  }

  fn modify_day(
    &self,
    user: &UserId,
    date: NaiveDate,
    apply: impl FnOnce(&mut Vec<TaskLog>) -> bool,
  ) -> Result<DailyProgress, AppError> {
    let mut task_logs = self.task_logs.lock()?;
    let mut logs = task_logs
      .get(user.as_str())
      .and_then(|days| days.get(&date))
      .cloned()
      .unwrap_or_default();
    if !apply(&mut logs) {
      return DailyProgress::from_logs(date, logs);
    }
    let progress = DailyProgress::from_logs(date, logs)?;

    let mut next = task_logs.clone();
    let days = next.entry(user.as_str().to_string()).or_default();
    if progress.logs.is_empty() {
      days.remove(&date);
      if days.is_empty() {
        next.remove(user.as_str());
      }
    } else {
      days.insert(date, progress.logs.clone());
    }
    save_document(&self.task_logs_path, &next)?;
    *task_logs = next;
    debug!(user = %user, %date, logs = progress.logs.len(), "daily progress written");
    Ok(progress)
  }
}

fn load_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T, AppError> {
  let data = match fs::read_to_string(path) {
    Ok(data) => data,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
    Err(err) => return Err(err.into()),
  };
  if data.trim().is_empty() {
    return Ok(T::default());
  }
  serde_json::from_str(&data)
    .map_err(|err| AppError::new("STORE_CORRUPT", format!("{} is unreadable: {err}", path.display())))
}

fn save_document<T: Serialize>(path: &Path, document: &T) -> Result<(), AppError> {
  let data = serde_json::to_string_pretty(document)?;
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, data)?;
  fs::rename(&tmp, path)?;
  Ok(())
}

impl TaskLogStore for JsonStore {
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
    let logs = self.read_day(user, date, |logs| logs.cloned().unwrap_or_default())?;
    Ok(Outcome::Done(logs))
  }

  fn daily_progress(&self, user: Option<&UserId>, date: NaiveDate) -> Result<Outcome<Option<DailyProgress>>, AppError> {
    let Some(user) = authenticated(user, "daily_progress") else {
      return Ok(Outcome::Unauthenticated);
    };
    let progress = self
      .read_day(user, date, |logs| logs.map(|logs| DailyProgress::from_logs(date, logs.clone())))?
      .transpose()?;
    Ok(Outcome::Done(progress))
  }

  fn all_progress(&self, user: Option<&UserId>) -> Result<Outcome<Vec<DailyProgress>>, AppError> {
    let Some(user) = authenticated(user, "all_progress") else {
      return Ok(Outcome::Unauthenticated);
    };
    let task_logs = self.task_logs.lock()?;
    let days = match task_logs.get(user.as_str()) {
      Some(days) => days
        .iter()
        .rev()
        .map(|(date, logs)| DailyProgress::from_logs(*date, logs.clone()))
        .collect::<Result<Vec<_>, _>>()?,
      None => Vec::new(),
    };
    Ok(Outcome::Done(days))
  }

  fn log_exists(&self, user: Option<&UserId>, key: &LogKey) -> Result<Outcome<bool>, AppError> {
    let Some(user) = authenticated(user, "log_exists") else {
      return Ok(Outcome::Unauthenticated);
    };
    let exists = self.read_day(user, key.date, |logs| {
      logs.map(|logs| logs.iter().any(|log| key.matches(log))).unwrap_or(false)
    })?;
    Ok(Outcome::Done(exists))
  }
}

impl FinanceStore for JsonStore {
  fn save_record(&self, user: Option<&UserId>, record: NewFinanceRecord) -> Result<Outcome<FinanceRecord>, AppError> {
    let Some(user) = authenticated(user, "save_record") else {
      return Ok(Outcome::Unauthenticated);
    };
    let record = build_record(record);
    let mut finance = self.finance.lock()?;
    let mut next = finance.clone();
    next.entry(user.as_str().to_string()).or_default().push(record.clone());
    save_document(&self.finance_path, &next)?;
    *finance = next;
    debug!(user = %user, id = %record.id, kind = record.kind.as_str(), "finance record stored");
    Ok(Outcome::Done(record))
  }

  fn all_records(&self, user: Option<&UserId>) -> Result<Outcome<Vec<FinanceRecord>>, AppError> {
    let Some(user) = authenticated(user, "all_records") else {
      return Ok(Outcome::Unauthenticated);
    };
    let finance = self.finance.lock()?;
    let mut records = finance.get(user.as_str()).cloned().unwrap_or_default();
    sort_records(&mut records);
    Ok(Outcome::Done(records))
  }
}
