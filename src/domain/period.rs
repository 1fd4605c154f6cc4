use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
  Daily,
  Weekly,
  Monthly,
  Yearly,
}

impl Period {
  pub fn parse(value: &str) -> Result<Self, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
      "daily" => Ok(Period::Daily),
      "weekly" => Ok(Period::Weekly),
      "monthly" => Ok(Period::Monthly),
      "yearly" => Ok(Period::Yearly),
      _ => Err(AppError::new(
        "INVALID_PERIOD",
        "Period must be daily, weekly, monthly or yearly",
      )),
    }
  }

  /// Inclusive calendar range containing `reference`. Weeks start on Sunday.
  pub fn range(self, reference: NaiveDate) -> Result<PeriodRange, AppError> {
    let (start, end) = match self {
      Period::Daily => (Some(reference), Some(reference)),
      Period::Weekly => {
        let offset = i64::from(reference.weekday().num_days_from_sunday());
        let start = reference.checked_sub_signed(Duration::days(offset));
        (start, start.and_then(|start| start.checked_add_signed(Duration::days(6))))
      }
      Period::Monthly => {
        let (year, month) = (reference.year(), reference.month());
        let next = if month == 12 {
          NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
          NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        (reference.with_day(1), next.and_then(|next| next.pred_opt()))
      }
      Period::Yearly => (
        NaiveDate::from_ymd_opt(reference.year(), 1, 1),
        NaiveDate::from_ymd_opt(reference.year(), 12, 31),
      ),
    };
    match (start, end) {
      (Some(start), Some(end)) => Ok(PeriodRange { start, end }),
      _ => Err(AppError::new("INVALID_DATE", format!("No {} range around {reference}", self.as_str()))),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Period::Daily => "daily",
      Period::Weekly => "weekly",
      Period::Monthly => "monthly",
      Period::Yearly => "yearly",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodRange {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl PeriodRange {
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }
}
