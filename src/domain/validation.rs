use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::domain::catalog;
use crate::error::AppError;
use crate::models::{FinanceInput, FinanceType, NewFinanceRecord};

const MAX_DESCRIPTION_LEN: usize = 500;
// four-digit years keep stored dates sortable as text
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

pub fn parse_date(date: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
    .map_err(|_| AppError::new("INVALID_DATE", "Date must be YYYY-MM-DD"))
    .and_then(supported_year)
}

fn supported_year(date: NaiveDate) -> Result<NaiveDate, AppError> {
  if YEARS.contains(&date.year()) {
    Ok(date)
  } else {
    Err(AppError::new("INVALID_DATE", "Year must be between 0001 and 9999"))
  }
}

/// Accepts a plain date or a date-time and keeps only the calendar date, as
/// written in the value's own offset.
pub fn parse_reference_date(value: &str) -> Result<NaiveDate, AppError> {
  let value = value.trim();
  if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
    return supported_year(date);
  }
  if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
    return supported_year(datetime.date_naive());
  }
  for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
      return supported_year(datetime.date());
    }
  }
  Err(AppError::new("INVALID_DATE", "Reference date must be YYYY-MM-DD or an ISO date-time"))
}

pub fn ensure_amount_non_negative(amount: f64) -> Result<(), AppError> {
  if !amount.is_finite() || amount < 0.0 {
    Err(AppError::new("INVALID_AMOUNT", "Amount must be a number >= 0"))
  } else {
    Ok(())
  }
}

pub fn parse_finance_type(value: &str) -> Result<FinanceType, AppError> {
  FinanceType::parse(value)
    .ok_or_else(|| AppError::new("INVALID_TYPE", "Type must be income, expense or savings"))
}

pub fn ensure_finance_category(kind: FinanceType, category: &str) -> Result<(), AppError> {
  if catalog::finance_categories(kind).contains(&category) {
    Ok(())
  } else {
    Err(AppError::new(
      "INVALID_CATEGORY",
      format!("'{category}' is not a {} category", kind.as_str()),
    ))
  }
}

pub fn finance_record(input: FinanceInput) -> Result<NewFinanceRecord, AppError> {
  let kind = parse_finance_type(&input.kind)?;
  ensure_amount_non_negative(input.amount)?;
  let category = input.category.trim().to_string();
  ensure_finance_category(kind, &category)?;
  let date = parse_date(&input.date)?;

  let description = input
    .description
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty());
  if description.as_ref().is_some_and(|value| value.chars().count() > MAX_DESCRIPTION_LEN) {
    return Err(AppError::new("INVALID_DESCRIPTION", "Description is too long"));
  }

  Ok(NewFinanceRecord {
    kind,
    amount: input.amount,
    category,
    date,
    description,
  })
}

/// Points a (sub)task is worth according to the catalog.
pub fn catalog_points(task_id: &str, subtask_id: Option<&str>) -> Result<u32, AppError> {
  let task = catalog::find_task(task_id)
    .ok_or_else(|| AppError::new("UNKNOWN_TASK", format!("Unknown task '{task_id}'")))?;
  match subtask_id {
    None => Ok(task.points),
    Some(subtask_id) => task
      .subtask(subtask_id)
      .map(|subtask| subtask.points)
      .ok_or_else(|| AppError::new("UNKNOWN_SUBTASK", format!("Unknown subtask '{subtask_id}' of '{task_id}'"))),
  }
}

/// A client may log fewer points than the catalog grants, never more.
pub fn logged_points(requested: Option<u32>, catalog_points: u32) -> Result<u32, AppError> {
  match requested {
    None => Ok(catalog_points),
    Some(points) if points <= catalog_points => Ok(points),
    Some(points) => Err(AppError::new(
      "INVALID_POINTS",
      format!("{points} points exceed the {catalog_points} this task is worth"),
    )),
  }
}

pub fn normalize_subtask(subtask_id: Option<String>) -> Option<String> {
  subtask_id
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}
