use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::period::{Period, PeriodRange};
use crate::error::AppError;

const MAX_USER_ID_LEN: usize = 128;

/// Key of the authenticated user, as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  /// Returns `None` for anything that cannot be a user key, which callers
  /// treat the same as a missing user.
  pub fn parse(value: &str) -> Option<Self> {
    let value = value.trim();
    if value.is_empty() || value.len() > MAX_USER_ID_LEN {
      return None;
    }
    let valid = value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-'));
    if valid {
      Some(Self(value.to_string()))
    } else {
      None
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for UserId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLog {
  pub date: NaiveDate,
  pub task_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtask_id: Option<String>,
  pub points: u32,
  pub timestamp: i64,
}

impl TaskLog {
  pub fn key(&self) -> LogKey {
    LogKey {
      date: self.date,
      task_id: self.task_id.clone(),
      subtask_id: self.subtask_id.clone(),
    }
  }
}

/// Identity of a [`TaskLog`]: a log without subtask is the whole-task entry
/// and never matches any of the task's subtask logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogKey {
  pub date: NaiveDate,
  pub task_id: String,
  pub subtask_id: Option<String>,
}

impl LogKey {
  pub fn new(date: NaiveDate, task_id: impl Into<String>, subtask_id: Option<String>) -> Self {
    Self {
      date,
      task_id: task_id.into(),
      subtask_id,
    }
  }

  pub fn matches(&self, log: &TaskLog) -> bool {
    log.date == self.date && log.task_id == self.task_id && log.subtask_id == self.subtask_id
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
  pub date: NaiveDate,
  pub total_points: u32,
  pub logs: Vec<TaskLog>,
}

impl DailyProgress {
  pub fn from_logs(date: NaiveDate, logs: Vec<TaskLog>) -> Result<Self, AppError> {
    Ok(Self {
      date,
      total_points: total_points(&logs)?,
      logs,
    })
  }
}

/// Sum of the log points; fails instead of wrapping past `u32::MAX`.
pub fn total_points(logs: &[TaskLog]) -> Result<u32, AppError> {
  logs
    .iter()
    .try_fold(0u32, |total, log| total.checked_add(log.points))
    .ok_or_else(|| AppError::new("INVALID_POINTS", "Daily points total is out of range"))
}

/// Replaces a log with the same key or appends; returns true when appended.
pub fn upsert_log(logs: &mut Vec<TaskLog>, log: TaskLog) -> bool {
  let key = log.key();
  match logs.iter_mut().find(|existing| key.matches(existing)) {
    Some(existing) => {
      *existing = log;
      false
    }
    None => {
      logs.push(log);
      true
    }
  }
}

/// Drops the log matching `key`; returns true when something was removed.
pub fn remove_log(logs: &mut Vec<TaskLog>, key: &LogKey) -> bool {
  let before = logs.len();
  logs.retain(|log| !key.matches(log));
  logs.len() != before
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceType {
  Income,
  Expense,
  Savings,
}

impl FinanceType {
  pub const ALL: [FinanceType; 3] = [FinanceType::Income, FinanceType::Expense, FinanceType::Savings];

  pub fn as_str(self) -> &'static str {
    match self {
      FinanceType::Income => "income",
      FinanceType::Expense => "expense",
      FinanceType::Savings => "savings",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "income" => Some(FinanceType::Income),
      "expense" => Some(FinanceType::Expense),
      "savings" => Some(FinanceType::Savings),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceRecord {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: FinanceType,
  pub amount: f64,
  pub category: String,
  pub date: NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub timestamp: i64,
}

/// A validated transaction waiting for its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFinanceRecord {
  pub kind: FinanceType,
  pub amount: f64,
  pub category: String,
  pub date: NaiveDate,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceStats {
  pub income: f64,
  pub expense: f64,
  pub savings: f64,
}

impl FinanceStats {
  pub fn add(&mut self, kind: FinanceType, amount: f64) {
    match kind {
      FinanceType::Income => self.income += amount,
      FinanceType::Expense => self.expense += amount,
      FinanceType::Savings => self.savings += amount,
    }
  }

  pub fn net_balance(&self) -> f64 {
    self.income - self.expense
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReport {
  pub period: Period,
  pub range: PeriodRange,
  pub stats: FinanceStats,
  pub net_balance: f64,
  pub records: Vec<FinanceRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPointsReport {
  pub period: Period,
  pub range: PeriodRange,
  pub total_points: u32,
  pub active_days: usize,
  pub per_task: BTreeMap<String, u32>,
  pub days: Vec<DailyProgress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
  pub date: NaiveDate,
  pub today_points: u32,
  pub max_daily_points: u32,
  pub progress_percent: f64,
  pub week_points: u32,
  pub week_average: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
  pub total_points: u32,
  pub average_daily: u32,
  pub days: Vec<DailyProgress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResult {
  pub completed: bool,
  pub points_delta: i64,
  pub progress: DailyProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskResult {
  pub points_added: u32,
  pub progress: DailyProgress,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLogInput {
  pub date: String,
  pub task_id: String,
  #[serde(default)]
  pub subtask_id: Option<String>,
  #[serde(default)]
  pub points: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskInput {
  pub date: String,
  pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceInput {
  #[serde(rename = "type")]
  pub kind: String,
  pub amount: f64,
  pub category: String,
  pub date: String,
  #[serde(default)]
  pub description: Option<String>,
}
