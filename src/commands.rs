use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate, Utc};
use tracing::info;

use crate::domain::catalog::{self, LocalizedTask};
use crate::domain::i18n;
use crate::domain::period::Period;
use crate::domain::validation;
use crate::error::AppError;
use crate::models::*;
use crate::reports;
use crate::settings::{Language, Settings, SettingsInput};
use crate::AppState;

pub fn get_settings(state: &AppState) -> Result<Settings, AppError> {
  state.settings.get()
}

pub fn update_settings(state: &AppState, input: SettingsInput) -> Result<Settings, AppError> {
  let settings = input.validate()?;
  let saved = state.settings.update(settings)?;
  info!(language = ?saved.language, "settings updated");
  Ok(saved)
}

/// An explicit `lang` wins over the stored preference.
pub fn resolve_language(state: &AppState, lang: Option<&str>) -> Result<Language, AppError> {
  match lang.map(str::trim).filter(|value| !value.is_empty()) {
    Some(value) => Language::parse(value),
    None => Ok(state.settings.get()?.language),
  }
}

pub fn task_catalog(state: &AppState, lang: Option<&str>) -> Result<Vec<LocalizedTask>, AppError> {
  Ok(catalog::localized_tasks(resolve_language(state, lang)?))
}

pub fn finance_categories() -> BTreeMap<FinanceType, &'static [&'static str]> {
  FinanceType::ALL
    .iter()
    .map(|kind| (*kind, catalog::finance_categories(*kind)))
    .collect()
}

pub fn ui_strings(state: &AppState, lang: Option<&str>) -> Result<BTreeMap<&'static str, &'static str>, AppError> {
  Ok(i18n::table(resolve_language(state, lang)?))
}

pub fn log_task(state: &AppState, user: Option<&UserId>, input: TaskLogInput) -> Result<DailyProgress, AppError> {
  let date = validation::parse_date(&input.date)?;
  let task_id = input.task_id.trim().to_string();
  let subtask_id = validation::normalize_subtask(input.subtask_id);
  let catalog_points = validation::catalog_points(&task_id, subtask_id.as_deref())?;
  let points = validation::logged_points(input.points, catalog_points)?;

  let log = TaskLog {
    date,
    task_id,
    subtask_id,
    points,
    timestamp: Utc::now().timestamp_millis(),
  };
  state.store.save_log(user, log)?.require_user()
}

pub fn remove_task(
  state: &AppState,
  user: Option<&UserId>,
  date: &str,
  task_id: &str,
  subtask_id: Option<String>,
) -> Result<DailyProgress, AppError> {
  let key = log_key(date, task_id, subtask_id)?;
  state.store.remove_log(user, &key)?.require_user()
}

pub fn task_exists(
  state: &AppState,
  user: Option<&UserId>,
  date: &str,
  task_id: &str,
  subtask_id: Option<String>,
) -> Result<bool, AppError> {
  let key = log_key(date, task_id, subtask_id)?;
  state.store.log_exists(user, &key)?.require_user()
}

/// Flips the completion of a (sub)task: an existing log is removed, a missing
/// one is saved with catalog points.
pub fn toggle_task(
  state: &AppState,
  user: Option<&UserId>,
  date: &str,
  task_id: &str,
  subtask_id: Option<String>,
) -> Result<ToggleResult, AppError> {
  let key = log_key(date, task_id, subtask_id)?;
  let points = validation::catalog_points(&key.task_id, key.subtask_id.as_deref())?;

  let logs = state.store.logs_for_date(user, key.date)?.require_user()?;
  if let Some(existing) = logs.iter().find(|log| key.matches(log)) {
    let removed = existing.points;
    let progress = state.store.remove_log(user, &key)?.require_user()?;
    return Ok(ToggleResult {
      completed: false,
      points_delta: -i64::from(removed),
      progress,
    });
  }

  let log = TaskLog {
    date: key.date,
    task_id: key.task_id,
    subtask_id: key.subtask_id,
    points,
    timestamp: Utc::now().timestamp_millis(),
  };
  let progress = state.store.save_log(user, log)?.require_user()?;
  Ok(ToggleResult {
    completed: true,
    points_delta: i64::from(points),
    progress,
  })
}

/// Logs every subtask of `task_id` not yet logged on the date, in one write.
pub fn complete_task(state: &AppState, user: Option<&UserId>, input: CompleteTaskInput) -> Result<CompleteTaskResult, AppError> {
  let date = validation::parse_date(&input.date)?;
  let task_id = input.task_id.trim();
  let task = catalog::find_task(task_id)
    .ok_or_else(|| AppError::new("UNKNOWN_TASK", format!("Unknown task '{task_id}'")))?;

  let timestamp = Utc::now().timestamp_millis();
  let candidates = task
    .subtasks
    .iter()
    .map(|subtask| TaskLog {
      date,
      task_id: task.id.to_string(),
      subtask_id: Some(subtask.id.to_string()),
      points: subtask.points,
      timestamp,
    })
    .collect();

  let (progress, added) = state.store.add_missing_logs(user, date, candidates)?.require_user()?;
  Ok(CompleteTaskResult {
    points_added: added.iter().map(|log| log.points).sum(),
    progress,
  })
}

/// `taskId` for whole-task logs, `taskId-subtaskId` for subtask logs.
pub fn completed_keys(state: &AppState, user: Option<&UserId>, date: &str) -> Result<BTreeSet<String>, AppError> {
  let date = validation::parse_date(date)?;
  let logs = state.store.logs_for_date(user, date)?.require_user()?;
  Ok(
    logs
      .iter()
      .map(|log| match &log.subtask_id {
        Some(subtask_id) => format!("{}-{}", log.task_id, subtask_id),
        None => log.task_id.clone(),
      })
      .collect(),
  )
}

pub fn progress_for_date(state: &AppState, user: Option<&UserId>, date: &str) -> Result<Option<DailyProgress>, AppError> {
  let date = validation::parse_date(date)?;
  state.store.daily_progress(user, date)?.require_user()
}

pub fn all_progress(state: &AppState, user: Option<&UserId>) -> Result<Vec<DailyProgress>, AppError> {
  state.store.all_progress(user)?.require_user()
}

pub fn dashboard(state: &AppState, user: Option<&UserId>, reference: Option<&str>) -> Result<DashboardSummary, AppError> {
  let reference = reference_date(reference)?;
  let progress = state.store.all_progress(user)?.require_user()?;
  reports::dashboard(&progress, reference)
}

pub fn history(state: &AppState, user: Option<&UserId>) -> Result<HistorySummary, AppError> {
  let progress = state.store.all_progress(user)?.require_user()?;
  Ok(reports::history(progress))
}

pub fn task_stats(
  state: &AppState,
  user: Option<&UserId>,
  period: &str,
  reference: Option<&str>,
) -> Result<TaskPointsReport, AppError> {
  let period = Period::parse(period)?;
  let reference = reference_date(reference)?;
  let progress = state.store.all_progress(user)?.require_user()?;
  reports::task_points_report(&progress, period, reference)
}

pub fn log_finance(state: &AppState, user: Option<&UserId>, input: FinanceInput) -> Result<FinanceRecord, AppError> {
  let record = validation::finance_record(input)?;
  state.store.save_record(user, record)?.require_user()
}

pub fn list_finance(state: &AppState, user: Option<&UserId>) -> Result<Vec<FinanceRecord>, AppError> {
  state.store.all_records(user)?.require_user()
}

pub fn finance_report(
  state: &AppState,
  user: Option<&UserId>,
  period: &str,
  reference: Option<&str>,
) -> Result<FinanceReport, AppError> {
  let period = Period::parse(period)?;
  let reference = reference_date(reference)?;
  let records = state.store.all_records(user)?.require_user()?;
  reports::finance_report(&records, period, reference)
}

fn log_key(date: &str, task_id: &str, subtask_id: Option<String>) -> Result<LogKey, AppError> {
  let date = validation::parse_date(date)?;
  let task_id = task_id.trim();
  if task_id.is_empty() {
    return Err(AppError::new("UNKNOWN_TASK", "Task id is required"));
  }
  Ok(LogKey::new(date, task_id, validation::normalize_subtask(subtask_id)))
}

/// Today in local time when no reference is given.
fn reference_date(reference: Option<&str>) -> Result<NaiveDate, AppError> {
  match reference.map(str::trim).filter(|value| !value.is_empty()) {
    Some(value) => validation::parse_reference_date(value),
    None => Ok(Local::now().date_naive()),
  }
}
