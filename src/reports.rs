use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::domain::catalog::max_daily_points;
use crate::domain::period::{Period, PeriodRange};
use crate::error::AppError;
use crate::models::{
  DailyProgress, DashboardSummary, FinanceRecord, FinanceReport, FinanceStats, HistorySummary, TaskPointsReport,
};

const DASHBOARD_WINDOW_DAYS: i64 = 7;

pub struct Aggregate {
  pub range: PeriodRange,
  pub stats: FinanceStats,
  pub records: Vec<FinanceRecord>,
}

/// Filters `records` to the period containing `reference` and sums them per
/// finance type. Input order is kept in the filtered subset.
pub fn aggregate(records: &[FinanceRecord], period: Period, reference: NaiveDate) -> Result<Aggregate, AppError> {
  let range = period.range(reference)?;
  let records: Vec<FinanceRecord> = records
    .iter()
    .filter(|record| range.contains(record.date))
    .cloned()
    .collect();
  let stats = summarize(&records);
  Ok(Aggregate { range, stats, records })
}

pub fn summarize(records: &[FinanceRecord]) -> FinanceStats {
  records.iter().fold(FinanceStats::default(), |mut stats, record| {
    stats.add(record.kind, record.amount);
    stats
  })
}

pub fn finance_report(records: &[FinanceRecord], period: Period, reference: NaiveDate) -> Result<FinanceReport, AppError> {
  let Aggregate { range, stats, records } = aggregate(records, period, reference)?;
  Ok(FinanceReport {
    period,
    range,
    net_balance: stats.net_balance(),
    stats,
    records,
  })
}

pub fn task_points_report(
  progress: &[DailyProgress],
  period: Period,
  reference: NaiveDate,
) -> Result<TaskPointsReport, AppError> {
  let range = period.range(reference)?;
  let days: Vec<DailyProgress> = progress
    .iter()
    .filter(|day| range.contains(day.date))
    .cloned()
    .collect();

  let mut per_task: BTreeMap<String, u32> = BTreeMap::new();
  for log in days.iter().flat_map(|day| day.logs.iter()) {
    let points = per_task.entry(log.task_id.clone()).or_default();
    *points = points.saturating_add(log.points);
  }

  Ok(TaskPointsReport {
    period,
    range,
    total_points: sum_points(&days),
    active_days: days.iter().filter(|day| !day.logs.is_empty()).count(),
    per_task,
    days,
  })
}

pub fn dashboard(progress: &[DailyProgress], reference: NaiveDate) -> Result<DashboardSummary, AppError> {
  let window_start = reference
    .checked_sub_signed(Duration::days(DASHBOARD_WINDOW_DAYS - 1))
    .ok_or_else(|| AppError::new("INVALID_DATE", format!("No dashboard window ending at {reference}")))?;
  let today_points = progress
    .iter()
    .find(|day| day.date == reference)
    .map(|day| day.total_points)
    .unwrap_or(0);
  let week_points = progress
    .iter()
    .filter(|day| day.date >= window_start && day.date <= reference)
    .fold(0u32, |total, day| total.saturating_add(day.total_points));

  let max_daily_points = max_daily_points();
  let progress_percent = if max_daily_points == 0 {
    0.0
  } else {
    (today_points as f64 / max_daily_points as f64 * 100.0).min(100.0)
  };

  Ok(DashboardSummary {
    date: reference,
    today_points,
    max_daily_points,
    progress_percent,
    week_points,
    week_average: rounded_average(week_points, DASHBOARD_WINDOW_DAYS as usize),
  })
}

/// `progress` is expected newest first and is returned in that order.
pub fn history(progress: Vec<DailyProgress>) -> HistorySummary {
  let total_points = sum_points(&progress);
  HistorySummary {
    total_points,
    average_daily: rounded_average(total_points, progress.len()),
    days: progress,
  }
}

fn sum_points(days: &[DailyProgress]) -> u32 {
  days.iter().fold(0u32, |total, day| total.saturating_add(day.total_points))
}

fn rounded_average(total: u32, count: usize) -> u32 {
  if count == 0 {
    return 0;
  }
  (total as f64 / count as f64).round() as u32
}
