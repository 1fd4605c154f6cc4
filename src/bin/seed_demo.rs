use chrono::{Datelike, Duration, Local, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use home_ledger::commands;
use home_ledger::config::AppConfig;
use home_ledger::domain::catalog::{self, TASKS};
use home_ledger::error::AppError;
use home_ledger::models::{FinanceInput, FinanceType, TaskLogInput, UserId};
use home_ledger::AppState;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut args = std::env::args().skip(1);
  let user = args.next().unwrap_or_else(|| "demo".to_string());
  let user = UserId::parse(&user).ok_or_else(|| AppError::new("INVALID_USER", format!("'{user}' is not a valid user key")))?;
  let days = args
    .next()
    .and_then(|value| value.parse::<i64>().ok())
    .unwrap_or(60);
  let seed = match args.next() {
    Some(value) => value
      .parse::<u64>()
      .map_err(|_| AppError::new("INVALID_SEED", format!("'{value}' is not a valid seed")))?,
    None => Utc::now().timestamp_millis() as u64,
  };

  let config = AppConfig::from_env()?;
  let state = AppState::open(&config)?;
  let (logs, records) = seed_demo_data(&state, &user, days, seed)?;

  println!(
    "Seeded {logs} task logs and {records} finance records for {user} in {} (seed {seed})",
    config.data_dir.display()
  );
  Ok(())
}

/// Fills the last `days` days up to today with plausible chores and money
/// movements. The same `seed` always produces the same data.
fn seed_demo_data(state: &AppState, user: &UserId, days: i64, seed: u64) -> Result<(usize, usize), AppError> {
  let mut rng = MockRng::new(seed);
  let today = Local::now().date_naive();
  let mut logs = 0;
  let mut records = 0;

  for offset in (0..days.max(0)).rev() {
    let date = today - Duration::days(offset);
    let date_str = date.format("%Y-%m-%d").to_string();

    for task in TASKS {
      // some chores are skipped entirely on a given day
      if rng.next_u32() % 100 < 25 {
        continue;
      }
      for subtask in task.subtasks {
        if rng.next_u32() % 100 < 70 {
          commands::log_task(
            state,
            Some(user),
            TaskLogInput {
              date: date_str.clone(),
              task_id: task.id.to_string(),
              subtask_id: Some(subtask.id.to_string()),
              points: None,
            },
          )?;
          logs += 1;
        }
      }
    }

    let mut entries = Vec::new();
    if date.day() == 1 {
      entries.push((FinanceType::Income, "Salary", random_amount(&mut rng, 1800.0, 2600.0)));
      entries.push((FinanceType::Expense, "Rent", random_amount(&mut rng, 600.0, 800.0)));
      entries.push((FinanceType::Savings, pick(&mut rng, catalog::finance_categories(FinanceType::Savings)), 200.0));
    }
    if rng.next_u32() % 100 < 60 {
      let category = pick(&mut rng, &["Food", "Transport", "Shopping", "Utilities", "Health"]);
      entries.push((FinanceType::Expense, category, random_amount(&mut rng, 5.0, 120.0)));
    }
    if rng.next_u32() % 100 < 5 {
      entries.push((FinanceType::Income, "Freelance", random_amount(&mut rng, 50.0, 400.0)));
    }

    for (kind, category, amount) in entries {
      commands::log_finance(
        state,
        Some(user),
        FinanceInput {
          kind: kind.as_str().to_string(),
          amount,
          category: category.to_string(),
          date: date_str.clone(),
          description: Some(format!("Demo: {category}")),
        },
      )?;
      records += 1;
    }
  }

  info!(user = %user, days, seed, logs, records, "demo data seeded");
  Ok((logs, records))
}

fn pick(rng: &mut MockRng, options: &[&'static str]) -> &'static str {
  options[(rng.next_u32() as usize) % options.len()]
}

fn random_amount(rng: &mut MockRng, min: f64, max: f64) -> f64 {
  let range = (max - min).max(1.0);
  let base = min + (rng.next_u32() as f64 % range);
  let cents = (rng.next_u32() % 100) as f64 / 100.0;
  ((base + cents) * 100.0).round() / 100.0
}

struct MockRng {
  state: u64,
}

impl MockRng {
  fn new(seed: u64) -> Self {
    Self { state: seed }
  }

  fn next_u32(&mut self) -> u32 {
    self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
    (self.state >> 32) as u32
  }
}
