use std::collections::HashMap;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::UserId;
use crate::settings::SettingsInput;
use crate::AppState;

pub const USER_HEADER: &str = "X-User-Id";

/// Transport-independent view of an HTTP request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: HashMap<String, String>,
  pub user: Option<UserId>,
  pub body: Vec<u8>,
}

impl ApiRequest {
  pub fn new(method: Method, url: &str) -> Self {
    let (path, query) = match url.split_once('?') {
      Some((path, query)) => (path, parse_query(query)),
      None => (url, HashMap::new()),
    };
    Self {
      method,
      path: path.to_string(),
      query,
      user: None,
      body: Vec::new(),
    }
  }

  pub fn with_user(mut self, user: &str) -> Self {
    self.user = UserId::parse(user);
    self
  }

  pub fn with_json<T: Serialize>(mut self, payload: &T) -> Result<Self, AppError> {
    self.body = serde_json::to_vec(payload)?;
    Ok(self)
  }

  fn param(&self, name: &str) -> Option<&str> {
    self.query.get(name).map(String::as_str)
  }

  fn required(&self, name: &str) -> Result<&str, AppError> {
    self
      .param(name)
      .filter(|value| !value.trim().is_empty())
      .ok_or_else(|| AppError::new("INVALID_QUERY", format!("Query parameter '{name}' is required")))
  }

  fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
    serde_json::from_slice(&self.body).map_err(|err| AppError::new("INVALID_BODY", err.to_string()))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Value,
}

pub fn route(state: &AppState, request: &ApiRequest) -> ApiResponse {
  let user = request.user.as_ref();
  let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();

  match (&request.method, segments.as_slice()) {
    (Method::Get, ["health"]) => respond(Ok(json!({ "status": "ok" }))),
    (Method::Get, ["catalog", "tasks"]) => respond(commands::task_catalog(state, request.param("lang"))),
    (Method::Get, ["catalog", "finance-categories"]) => respond(Ok(commands::finance_categories())),
    (Method::Get, ["i18n"]) => respond(commands::ui_strings(state, request.param("lang"))),
    (Method::Get, ["settings"]) => respond(commands::get_settings(state)),
    (Method::Put, ["settings"]) => {
      respond(request.json::<SettingsInput>().and_then(|input| commands::update_settings(state, input)))
    }

    (Method::Get, ["progress"]) => respond(commands::all_progress(state, user)),
    (Method::Post, ["progress", "logs"]) => {
      respond(request.json().and_then(|input| commands::log_task(state, user, input)))
    }
    (Method::Delete, ["progress", "logs"]) => respond(request.required("date").and_then(|date| {
      commands::remove_task(state, user, date, request.required("taskId")?, subtask_param(request))
    })),
    (Method::Get, ["progress", "logs", "exists"]) => respond(request.required("date").and_then(|date| {
      commands::task_exists(state, user, date, request.required("taskId")?, subtask_param(request))
        .map(|exists| json!({ "exists": exists }))
    })),
    (Method::Post, ["progress", "toggle"]) => respond(request.json::<ToggleBody>().and_then(|body| {
      commands::toggle_task(state, user, &body.date, &body.task_id, body.subtask_id)
    })),
    (Method::Post, ["progress", "complete-task"]) => {
      respond(request.json().and_then(|input| commands::complete_task(state, user, input)))
    }
    (Method::Get, ["progress", "stats"]) => respond(
      request
        .required("period")
        .and_then(|period| commands::task_stats(state, user, period, request.param("date"))),
    ),
    (Method::Get, ["progress", date]) => respond(commands::progress_for_date(state, user, date)),
    (Method::Get, ["progress", date, "completed"]) => respond(commands::completed_keys(state, user, date)),

    (Method::Get, ["dashboard"]) => respond(commands::dashboard(state, user, request.param("date"))),
    (Method::Get, ["history"]) => respond(commands::history(state, user)),

    (Method::Get, ["finance", "records"]) => respond(commands::list_finance(state, user)),
    (Method::Post, ["finance", "records"]) => {
      respond(request.json().and_then(|input| commands::log_finance(state, user, input)))
    }
    (Method::Get, ["finance", "stats"]) => respond(
      request
        .required("period")
        .and_then(|period| commands::finance_report(state, user, period, request.param("date"))),
    ),

    _ => error_response(404, "NOT_FOUND", "Route not found"),
  }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
  date: String,
  task_id: String,
  #[serde(default)]
  subtask_id: Option<String>,
}

fn subtask_param(request: &ApiRequest) -> Option<String> {
  request.param("subtaskId").map(str::to_string)
}

fn respond<T: Serialize>(result: Result<T, AppError>) -> ApiResponse {
  let err = match result {
    Ok(payload) => match serde_json::to_value(payload) {
      Ok(body) => return ApiResponse { status: 200, body },
      Err(err) => AppError::from(err),
    },
    Err(err) => err,
  };

  let status = status_for(&err);
  if status >= 500 {
    error!(code = %err.code, message = %err.message, "request failed");
  } else {
    debug!(code = %err.code, status, "request rejected");
  }
  error_response(status, &err.code, &err.message)
}

fn status_for(err: &AppError) -> u16 {
  if err.code == "UNAUTHENTICATED" {
    401
  } else if err.is_validation() {
    400
  } else {
    500
  }
}

fn error_response(status: u16, code: &str, message: &str) -> ApiResponse {
  ApiResponse {
    status,
    body: json!({
      "code": code,
      "message": message,
    }),
  }
}

fn parse_query(query: &str) -> HashMap<String, String> {
  query
    .split('&')
    .filter(|pair| !pair.is_empty())
    .map(|pair| {
      let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
      (decode_component(key), decode_component(value))
    })
    .collect()
}

fn decode_component(value: &str) -> String {
  percent_decode_str(&value.replace('+', " ")).decode_utf8_lossy().into_owned()
}

/// Serves the API on `config.bind:config.port` until the listener fails.
pub fn serve(config: &AppConfig, state: &AppState) -> Result<(), AppError> {
  let server = Server::http((config.bind.as_str(), config.port))
    .map_err(|err| AppError::new("SERVER", format!("Cannot listen on {}:{}: {err}", config.bind, config.port)))?;
  info!(
    bind = %config.bind,
    port = config.port,
    lan = %format!("http://{}:{}", local_ip_string(), config.port),
    "home ledger api listening"
  );

  for request in server.incoming_requests() {
    handle_request(request, state);
  }
  Ok(())
}

pub fn local_ip_string() -> String {
  local_ip_address::local_ip()
    .map(|ip| ip.to_string())
    .unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn handle_request(mut request: Request, state: &AppState) {
  let mut api_request = ApiRequest::new(request.method().clone(), request.url());
  api_request.user = read_header(&request, USER_HEADER).and_then(|value| UserId::parse(&value));

  let response = if request.as_reader().read_to_end(&mut api_request.body).is_err() {
    error_response(400, "INVALID_BODY", "Request body could not be read")
  } else {
    contain_panics(|| route(state, &api_request))
  };
  debug!(method = %api_request.method, path = %api_request.path, status = response.status, "handled request");

  if let Err(err) = request.respond(json_response(response)) {
    warn!(error = %err, "failed to send response");
  }
}

/// Turns a panicking handler into a 500 so the listener keeps serving.
fn contain_panics(handler: impl FnOnce() -> ApiResponse) -> ApiResponse {
  panic::catch_unwind(AssertUnwindSafe(handler)).unwrap_or_else(|payload| {
    let detail = payload
      .downcast_ref::<&str>()
      .map(|message| message.to_string())
      .or_else(|| payload.downcast_ref::<String>().cloned())
      .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %detail, "request handler panicked");
    error_response(500, "INTERNAL", "Request could not be processed")
  })
}

fn read_header(request: &Request, name: &str) -> Option<String> {
  request
    .headers()
    .iter()
    .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
    .map(|header| header.value.to_string())
}

fn json_response(response: ApiResponse) -> Response<std::io::Cursor<Vec<u8>>> {
  let body = serde_json::to_vec(&response.body).unwrap_or_else(|_| b"{}".to_vec());
  let mut http = Response::from_data(body).with_status_code(StatusCode(response.status));
  if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
    http.add_header(header);
  }
  http
}
