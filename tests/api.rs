use serde_json::json;
use tiny_http::Method;

use home_ledger::config::{AppConfig, Backend};
use home_ledger::server::{route, ApiRequest, ApiResponse};
use home_ledger::AppState;

fn open_state(dir: &tempfile::TempDir, backend: Backend) -> AppState {
  let config = AppConfig {
    data_dir: dir.path().to_path_buf(),
    bind: "127.0.0.1".to_string(),
    port: 0,
    backend,
  };
  AppState::open(&config).unwrap()
}

fn call(state: &AppState, request: ApiRequest) -> ApiResponse {
  route(state, &request)
}

fn as_user(method: Method, url: &str) -> ApiRequest {
  ApiRequest::new(method, url).with_user("amina")
}

#[test]
fn task_log_lifecycle_over_http() {
  for backend in [Backend::Sqlite, Backend::Json] {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir, backend);

    let saved = call(
      &state,
      as_user(Method::Post, "/progress/logs").with_json(&json!({
        "date": "2024-03-10", "taskId": "kuoga", "subtaskId": "bathing"
      })).unwrap(),
    );
    assert_eq!(saved.status, 200);
    assert_eq!(saved.body["totalPoints"], 10);

    let saved = call(
      &state,
      as_user(Method::Post, "/progress/logs").with_json(&json!({
        "date": "2024-03-10", "taskId": "kuoga", "subtaskId": "teeth"
      })).unwrap(),
    );
    assert_eq!(saved.body["totalPoints"], 15);

    let exists = call(&state, as_user(Method::Get, "/progress/logs/exists?date=2024-03-10&taskId=kuoga&subtaskId=teeth"));
    assert_eq!(exists.body, json!({ "exists": true }));
    let exists = call(&state, as_user(Method::Get, "/progress/logs/exists?date=2024-03-10&taskId=kuoga"));
    assert_eq!(exists.body, json!({ "exists": false }));

    let removed = call(
      &state,
      as_user(Method::Delete, "/progress/logs?date=2024-03-10&taskId=kuoga&subtaskId=bathing"),
    );
    assert_eq!(removed.status, 200);
    assert_eq!(removed.body["totalPoints"], 5);

    let day = call(&state, as_user(Method::Get, "/progress/2024-03-10"));
    assert_eq!(day.body["logs"].as_array().unwrap().len(), 1);
    let completed = call(&state, as_user(Method::Get, "/progress/2024-03-10/completed"));
    assert_eq!(completed.body, json!(["kuoga-teeth"]));
  }
}

#[test]
fn finance_stats_over_http() {
  let dir = tempfile::tempdir().unwrap();
  let state = open_state(&dir, Backend::Json);

  for body in [
    json!({ "type": "expense", "amount": 500.0, "category": "Food", "date": "2024-03-01" }),
    json!({ "type": "income", "amount": 2000.0, "category": "Salary", "date": "2024-03-15", "description": " March " }),
  ] {
    let response = call(&state, as_user(Method::Post, "/finance/records").with_json(&body).unwrap());
    assert_eq!(response.status, 200);
  }

  let stats = call(&state, as_user(Method::Get, "/finance/stats?period=monthly&date=2024-03-20"));
  assert_eq!(stats.status, 200);
  assert_eq!(stats.body["stats"], json!({ "income": 2000.0, "expense": 500.0, "savings": 0.0 }));
  assert_eq!(stats.body["netBalance"], 1500.0);
  assert_eq!(stats.body["range"], json!({ "start": "2024-03-01", "end": "2024-03-31" }));

  let records = call(&state, as_user(Method::Get, "/finance/records"));
  assert_eq!(records.body[0]["description"], "March");
  assert_eq!(records.body[1]["type"], "expense");
}

#[test]
fn errors_use_expected_statuses() {
  let dir = tempfile::tempdir().unwrap();
  let state = open_state(&dir, Backend::Sqlite);

  let anonymous = call(&state, ApiRequest::new(Method::Get, "/history"));
  assert_eq!(anonymous.status, 401);
  assert_eq!(anonymous.body["code"], "UNAUTHENTICATED");

  let bad_period = call(&state, as_user(Method::Get, "/progress/stats?period=hourly"));
  assert_eq!(bad_period.status, 400);
  assert_eq!(bad_period.body["code"], "INVALID_PERIOD");

  let bad_body = call(&state, as_user(Method::Post, "/finance/records").with_json(&json!({ "amount": 3 })).unwrap());
  assert_eq!(bad_body.status, 400);

  let bad_amount = call(
    &state,
    as_user(Method::Post, "/finance/records").with_json(&json!({
      "type": "expense", "amount": -3.0, "category": "Food", "date": "2024-03-01"
    })).unwrap(),
  );
  assert_eq!(bad_amount.body["code"], "INVALID_AMOUNT");

  let missing = call(&state, as_user(Method::Get, "/nowhere"));
  assert_eq!(missing.status, 404);
}

#[test]
fn oversized_points_and_far_dates_are_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let state = open_state(&dir, Backend::Sqlite);

  for subtask in ["bathing", "teeth"] {
    let response = call(
      &state,
      as_user(Method::Post, "/progress/logs")
        .with_json(&json!({ "date": "2024-03-10", "taskId": "kuoga", "subtaskId": subtask, "points": 4000000000u32 }))
        .unwrap(),
    );
    assert_eq!(response.status, 400);
    assert_eq!(response.body["code"], "INVALID_POINTS");
  }

  for url in [
    "/finance/stats?period=monthly&date=%2B262142-12-31",
    "/dashboard?date=-262143-01-01",
    "/progress/stats?period=weekly&date=%2B10000-01-01",
  ] {
    let response = call(&state, as_user(Method::Get, url));
    assert_eq!(response.status, 400, "{url}");
    assert_eq!(response.body["code"], "INVALID_DATE", "{url}");
  }

  let far = call(
    &state,
    as_user(Method::Post, "/progress/logs")
      .with_json(&json!({ "date": "+10000-01-01", "taskId": "kufua" }))
      .unwrap(),
  );
  assert_eq!(far.status, 400);

  call(
    &state,
    as_user(Method::Post, "/progress/logs")
      .with_json(&json!({ "date": "2024-03-10", "taskId": "kufua" }))
      .unwrap(),
  );
  call(
    &state,
    as_user(Method::Post, "/progress/logs")
      .with_json(&json!({ "date": "0999-06-01", "taskId": "kufua" }))
      .unwrap(),
  );
  let days = call(&state, as_user(Method::Get, "/progress"));
  assert_eq!(days.status, 200);
  assert_eq!(days.body[0]["date"], "2024-03-10");
  assert_eq!(days.body[1]["date"], "0999-06-01");
}

#[test]
fn catalog_and_settings_follow_language() {
  let dir = tempfile::tempdir().unwrap();
  let state = open_state(&dir, Backend::Sqlite);

  let tasks = call(&state, ApiRequest::new(Method::Get, "/catalog/tasks?lang=en-sw"));
  assert_eq!(tasks.body[1]["name"], "Kufua (Laundry)");

  let updated = call(&state, ApiRequest::new(Method::Put, "/settings").with_json(&json!({ "language": "sw" })).unwrap());
  assert_eq!(updated.status, 200);
  let strings = call(&state, ApiRequest::new(Method::Get, "/i18n"));
  assert_eq!(strings.body["nav.history"], "Historia");

  let rejected = call(&state, ApiRequest::new(Method::Put, "/settings").with_json(&json!({ "language": "fr" })).unwrap());
  assert_eq!(rejected.status, 400);

  let categories = call(&state, ApiRequest::new(Method::Get, "/catalog/finance-categories"));
  assert_eq!(categories.body["savings"][0], "Emergency Fund");
}

#[test]
fn dashboard_and_history_summarize_points() {
  let dir = tempfile::tempdir().unwrap();
  let state = open_state(&dir, Backend::Sqlite);

  let toggled = call(
    &state,
    as_user(Method::Post, "/progress/toggle").with_json(&json!({ "date": "2024-03-19", "taskId": "kufua" })).unwrap(),
  );
  assert_eq!(toggled.body["completed"], true);
  assert_eq!(toggled.body["pointsDelta"], 20);

  let completed = call(
    &state,
    as_user(Method::Post, "/progress/complete-task").with_json(&json!({ "date": "2024-03-20", "taskId": "kupika" })).unwrap(),
  );
  assert_eq!(completed.body["pointsAdded"], 25);

  let dashboard = call(&state, as_user(Method::Get, "/dashboard?date=2024-03-20"));
  assert_eq!(dashboard.body["todayPoints"], 25);
  assert_eq!(dashboard.body["maxDailyPoints"], 100);
  assert_eq!(dashboard.body["weekPoints"], 45);

  let history = call(&state, as_user(Method::Get, "/history"));
  assert_eq!(history.body["totalPoints"], 45);
  assert_eq!(history.body["averageDaily"], 23);
  assert_eq!(history.body["days"][0]["date"], "2024-03-20");

  let stats = call(&state, as_user(Method::Get, "/progress/stats?period=weekly&date=2024-03-20"));
  assert_eq!(stats.body["perTask"], json!({ "kufua": 20, "kupika": 25 }));
}
