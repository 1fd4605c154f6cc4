//! Record Store: per-user task logs and finance records.
//!
//! Two interchangeable backends implement the same traits: [`SqliteStore`]
//! keeps one denormalized row per (user, date) plus one row per transaction,
//! [`JsonStore`] keeps one JSON blob per data kind on disk.

mod json;
mod sqlite;

use chrono::{NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use tracing::warn;

use crate::error::AppError;
use crate::models::{DailyProgress, FinanceRecord, LogKey, NewFinanceRecord, TaskLog, UserId};

pub use json::JsonStore;
pub use sqlite::SqliteStore;

const RECORD_ID_LEN: usize = 20;

/// Result of a store call that needs an authenticated user.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
  Done(T),
  Unauthenticated,
}

impl<T> Outcome<T> {
  pub fn done(self) -> Option<T> {
    match self {
      Outcome::Done(value) => Some(value),
      Outcome::Unauthenticated => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
    match self {
      Outcome::Done(value) => Outcome::Done(f(value)),
      Outcome::Unauthenticated => Outcome::Unauthenticated,
    }
  }

  pub fn require_user(self) -> Result<T, AppError> {
    self.done().ok_or_else(AppError::unauthenticated)
  }

  pub fn unwrap_or_default(self) -> T
  where
    T: Default,
  {
    self.done().unwrap_or_default()
  }
}

pub trait TaskLogStore: Send + Sync {
  /// Stores `log`, replacing a log with the same key, and returns the date's
  /// progress with its recomputed total.
  fn save_log(&self, user: Option<&UserId>, log: TaskLog) -> Result<Outcome<DailyProgress>, AppError>;

  /// Deletes the log matching `key` exactly and returns the date's progress.
  fn remove_log(&self, user: Option<&UserId>, key: &LogKey) -> Result<Outcome<DailyProgress>, AppError>;

  /// Adds every candidate whose key is not yet logged on `date` in a single
  /// write and returns the date's progress with the logs actually added.
  fn add_missing_logs(
    &self,
    user: Option<&UserId>,
    date: NaiveDate,
    candidates: Vec<TaskLog>,
  ) -> Result<Outcome<(DailyProgress, Vec<TaskLog>)>, AppError>;

  fn logs_for_date(&self, user: Option<&UserId>, date: NaiveDate) -> Result<Outcome<Vec<TaskLog>>, AppError>;

  fn daily_progress(&self, user: Option<&UserId>, date: NaiveDate) -> Result<Outcome<Option<DailyProgress>>, AppError>;

  /// Every logged date, newest first.
  fn all_progress(&self, user: Option<&UserId>) -> Result<Outcome<Vec<DailyProgress>>, AppError>;

  fn log_exists(&self, user: Option<&UserId>, key: &LogKey) -> Result<Outcome<bool>, AppError>;
}

pub trait FinanceStore: Send + Sync {
  fn save_record(&self, user: Option<&UserId>, record: NewFinanceRecord) -> Result<Outcome<FinanceRecord>, AppError>;

  /// Every record of the user, newest date first.
  fn all_records(&self, user: Option<&UserId>) -> Result<Outcome<Vec<FinanceRecord>>, AppError>;
}

pub trait RecordStore: TaskLogStore + FinanceStore {}

impl<T: TaskLogStore + FinanceStore> RecordStore for T {}

fn authenticated<'a>(user: Option<&'a UserId>, operation: &str) -> Option<&'a UserId> {
  if user.is_none() {
    warn!(operation, "store call without authenticated user ignored");
  }
  user
}

/// Appends the candidates missing from `logs`, pinned to `date`.
fn merge_missing(logs: &mut Vec<TaskLog>, date: NaiveDate, candidates: Vec<TaskLog>) -> Vec<TaskLog> {
  let mut added = Vec::new();
  for mut candidate in candidates {
    candidate.date = date;
    let key = candidate.key();
    if logs.iter().any(|log| key.matches(log)) {
      continue;
    }
    logs.push(candidate.clone());
    added.push(candidate);
  }
  added
}

fn build_record(record: NewFinanceRecord) -> FinanceRecord {
  FinanceRecord {
    id: generate_record_id(),
    kind: record.kind,
    amount: record.amount,
    category: record.category,
    date: record.date,
    description: record.description,
    timestamp: Utc::now().timestamp_millis(),
  }
}

fn generate_record_id() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(RECORD_ID_LEN)
    .map(char::from)
    .collect()
}

/// Newest date first; same-day records keep creation order, newest first.
fn sort_records(records: &mut [FinanceRecord]) {
  records.sort_by(|a, b| b.date.cmp(&a.date).then(b.timestamp.cmp(&a.timestamp)));
}

#[cfg(test)]
mod contract_tests {
  //! Behaviour every backend must share.

  use super::*;
  use crate::models::FinanceType;

  fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
  }

  fn log(day: &str, task: &str, subtask: Option<&str>, points: u32) -> TaskLog {
    TaskLog {
      date: date(day),
      task_id: task.to_string(),
      subtask_id: subtask.map(str::to_string),
      points,
      timestamp: Utc::now().timestamp_millis(),
    }
  }

  fn key(day: &str, task: &str, subtask: Option<&str>) -> LogKey {
    LogKey::new(date(day), task, subtask.map(str::to_string))
  }

  fn user() -> UserId {
    UserId::parse("amina").unwrap()
  }

  fn backends() -> Vec<(&'static str, Box<dyn RecordStore>, Option<tempfile::TempDir>)> {
    let dir = tempfile::tempdir().unwrap();
    let json = JsonStore::open(dir.path()).unwrap();
    vec![
      ("sqlite", Box::new(SqliteStore::in_memory().unwrap()), None),
      ("json", Box::new(json), Some(dir)),
    ]
  }

  #[test]
  fn save_then_list_and_total() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-10", "kuoga", Some("bathing"), 10)).unwrap();
      let progress = store
        .save_log(Some(&u), log("2024-03-10", "kuoga", Some("teeth"), 5))
        .unwrap()
        .require_user()
        .unwrap();
      assert_eq!(progress.total_points, 15, "{name}");

      let logs = store.logs_for_date(Some(&u), date("2024-03-10")).unwrap().require_user().unwrap();
      let ids: Vec<_> = logs.iter().map(|log| log.subtask_id.clone().unwrap()).collect();
      assert_eq!(ids, vec!["bathing", "teeth"], "{name}");

      let after = store
        .remove_log(Some(&u), &key("2024-03-10", "kuoga", Some("bathing")))
        .unwrap()
        .require_user()
        .unwrap();
      assert_eq!(after.total_points, 5, "{name}");
      assert_eq!(after.logs.len(), 1, "{name}");
    }
  }

  #[test]
  fn exists_follows_exact_key() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-11", "kufua", None, 20)).unwrap();
      assert_eq!(store.log_exists(Some(&u), &key("2024-03-11", "kufua", None)).unwrap(), Outcome::Done(true), "{name}");
      assert_eq!(
        store.log_exists(Some(&u), &key("2024-03-11", "kufua", Some("socks"))).unwrap(),
        Outcome::Done(false),
        "{name}"
      );
      assert_eq!(store.log_exists(Some(&u), &key("2024-03-12", "kufua", None)).unwrap(), Outcome::Done(false), "{name}");
    }
  }

  #[test]
  fn whole_task_remove_keeps_subtask_logs() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-10", "kupika", None, 25)).unwrap();
      store.save_log(Some(&u), log("2024-03-10", "kupika", Some("cooking"), 7)).unwrap();
      store.save_log(Some(&u), log("2024-03-10", "kupika", Some("sink"), 5)).unwrap();

      let progress = store
        .remove_log(Some(&u), &key("2024-03-10", "kupika", None))
        .unwrap()
        .require_user()
        .unwrap();
      assert_eq!(progress.logs.len(), 2, "{name}");
      assert_eq!(progress.total_points, 12, "{name}");
      assert!(progress.logs.iter().all(|log| log.subtask_id.is_some()), "{name}");
    }
  }

  #[test]
  fn saving_same_key_twice_keeps_one_log() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-10", "kuoga", Some("teeth"), 5)).unwrap();
      let progress = store
        .save_log(Some(&u), log("2024-03-10", "kuoga", Some("teeth"), 5))
        .unwrap()
        .require_user()
        .unwrap();
      assert_eq!(progress.logs.len(), 1, "{name}");
      assert_eq!(progress.total_points, 5, "{name}");
    }
  }

  #[test]
  fn total_matches_logs_after_mixed_operations() {
    for (name, store, _dir) in backends() {
      let u = user();
      let steps: [(bool, &str, Option<&str>, u32); 8] = [
        (true, "kuoga", Some("prep"), 5),
        (true, "kuoga", None, 30),
        (true, "kusafisha", Some("trash"), 2),
        (false, "kuoga", Some("prep"), 0),
        (true, "kusafisha", Some("mopping"), 5),
        (false, "kuoga", Some("grooming"), 0),
        (true, "kuoga", Some("prep"), 5),
        (false, "kuoga", None, 0),
      ];
      for (save, task, subtask, points) in steps {
        if save {
          store.save_log(Some(&u), log("2024-05-01", task, subtask, points)).unwrap();
        } else {
          store.remove_log(Some(&u), &key("2024-05-01", task, subtask)).unwrap();
        }
        let progress = store.daily_progress(Some(&u), date("2024-05-01")).unwrap().require_user().unwrap();
        if let Some(progress) = progress {
          let sum: u32 = progress.logs.iter().map(|log| log.points).sum();
          assert_eq!(progress.total_points, sum, "{name}");
        }
      }
      let final_progress = store.daily_progress(Some(&u), date("2024-05-01")).unwrap().require_user().unwrap().unwrap();
      assert_eq!(final_progress.total_points, 12, "{name}");
    }
  }

  #[test]
  fn add_missing_logs_skips_logged_keys_in_one_write() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-10", "kufua", Some("socks"), 4)).unwrap();
      let candidates = vec![
        log("2024-03-10", "kufua", Some("socks"), 4),
        log("2024-03-10", "kufua", Some("tops"), 4),
        log("2024-03-10", "kufua", Some("linens"), 2),
      ];
      let (progress, added) = store
        .add_missing_logs(Some(&u), date("2024-03-10"), candidates)
        .unwrap()
        .require_user()
        .unwrap();
      assert_eq!(added.len(), 2, "{name}");
      assert_eq!(progress.total_points, 10, "{name}");
      assert_eq!(progress.logs.len(), 3, "{name}");

      let (_, again) = store
        .add_missing_logs(Some(&u), date("2024-03-10"), vec![log("2024-03-10", "kufua", Some("tops"), 4)])
        .unwrap()
        .require_user()
        .unwrap();
      assert!(again.is_empty(), "{name}");
    }
  }

  #[test]
  fn overflowing_total_is_rejected_without_writing() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-10", "kuoga", Some("bathing"), u32::MAX)).unwrap();
      let err = store
        .save_log(Some(&u), log("2024-03-10", "kuoga", Some("teeth"), 1))
        .unwrap_err();
      assert_eq!(err.code, "INVALID_POINTS", "{name}");

      let logs = store.logs_for_date(Some(&u), date("2024-03-10")).unwrap().require_user().unwrap();
      assert_eq!(logs.len(), 1, "{name}");
      store.save_log(Some(&u), log("2024-03-11", "kufua", None, 20)).unwrap();
    }
  }

  #[test]
  fn removing_last_log_drops_the_date() {
    for (name, store, _dir) in backends() {
      let u = user();
      store.save_log(Some(&u), log("2024-03-10", "kufua", Some("socks"), 4)).unwrap();
      let progress = store
        .remove_log(Some(&u), &key("2024-03-10", "kufua", Some("socks")))
        .unwrap()
        .require_user()
        .unwrap();
      assert_eq!(progress.total_points, 0, "{name}");
      assert!(progress.logs.is_empty(), "{name}");
      assert_eq!(store.daily_progress(Some(&u), date("2024-03-10")).unwrap(), Outcome::Done(None), "{name}");
      assert!(store.all_progress(Some(&u)).unwrap().require_user().unwrap().is_empty(), "{name}");
    }
  }

  #[test]
  fn all_progress_is_newest_first_and_per_user() {
    for (name, store, _dir) in backends() {
      let u = user();
      let other = UserId::parse("baraka").unwrap();
      store.save_log(Some(&u), log("2024-03-09", "kufua", None, 20)).unwrap();
      store.save_log(Some(&u), log("2024-03-11", "kuoga", None, 30)).unwrap();
      store.save_log(Some(&u), log("2024-03-10", "kupika", None, 25)).unwrap();
      store.save_log(Some(&other), log("2024-03-12", "kupika", None, 25)).unwrap();

      let dates: Vec<_> = store
        .all_progress(Some(&u))
        .unwrap()
        .require_user()
        .unwrap()
        .into_iter()
        .map(|progress| progress.date)
        .collect();
      assert_eq!(dates, vec![date("2024-03-11"), date("2024-03-10"), date("2024-03-09")], "{name}");
    }
  }

  #[test]
  fn unauthenticated_calls_have_no_effect() {
    for (name, store, _dir) in backends() {
      let u = user();
      assert_eq!(
        store.save_log(None, log("2024-03-10", "kuoga", None, 30)).unwrap(),
        Outcome::Unauthenticated,
        "{name}"
      );
      assert_eq!(store.all_progress(None).unwrap(), Outcome::Unauthenticated, "{name}");
      assert_eq!(store.log_exists(None, &key("2024-03-10", "kuoga", None)).unwrap(), Outcome::Unauthenticated, "{name}");
      assert!(store.all_progress(Some(&u)).unwrap().require_user().unwrap().is_empty(), "{name}");

      let record = NewFinanceRecord {
        kind: FinanceType::Income,
        amount: 1.0,
        category: "Gift".to_string(),
        date: date("2024-03-10"),
        description: None,
      };
      assert_eq!(store.save_record(None, record).unwrap(), Outcome::Unauthenticated, "{name}");
      assert!(store.all_records(None).unwrap().unwrap_or_default().is_empty(), "{name}");
    }
  }

  #[test]
  fn finance_records_get_ids_and_newest_first_order() {
    for (name, store, _dir) in backends() {
      let u = user();
      let make = |kind, amount, category: &str, day| NewFinanceRecord {
        kind,
        amount,
        category: category.to_string(),
        date: date(day),
        description: Some("note".to_string()),
      };
      let first = store
        .save_record(Some(&u), make(FinanceType::Expense, 500.0, "Food", "2024-03-01"))
        .unwrap()
        .require_user()
        .unwrap();
      let second = store
        .save_record(Some(&u), make(FinanceType::Income, 2000.0, "Salary", "2024-03-15"))
        .unwrap()
        .require_user()
        .unwrap();
      assert_ne!(first.id, second.id, "{name}");
      assert_eq!(first.id.len(), RECORD_ID_LEN, "{name}");

      let records = store.all_records(Some(&u)).unwrap().require_user().unwrap();
      assert_eq!(records.len(), 2, "{name}");
      assert_eq!(records[0], second, "{name}");
      assert_eq!(records[1], first, "{name}");
    }
  }
}
