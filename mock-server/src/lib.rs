//! In-memory stand-in for the ServiceNow table API.
//!
//! Serves `/api/now/v2/table/{table}[/{sys_id}]` with Basic authentication.
//! Records are stored as JSON objects and returned the way an instance
//! returns them: every scalar as a string, reference fields as
//! `{link, value}` objects, `sys_id` and `number` assigned on insert, and
//! `priority` derived from impact and urgency.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
pub use axum::http::StatusCode;
use base64::Engine;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub type Record = Map<String, Value>;

/// Rows per table name.
pub type Db = Arc<RwLock<HashMap<String, Vec<Record>>>>;

/// Reference fields and the table they point at.
const REFERENCE_FIELDS: &[(&str, &str)] = &[
    ("assignment_group", "sys_user_group"),
    ("caller_id", "sys_user"),
];

/// Fields the server owns; request bodies cannot overwrite them.
const READ_ONLY_FIELDS: &[&str] = &["sys_id", "number", "priority"];

const FIRST_NUMBER: u64 = 10001;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub user_name: String,
    pub password: String,
    /// Answer every request with this status instead of serving it.
    pub fail_with: Option<StatusCode>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            user_name: "admin".to_string(),
            password: "admin".to_string(),
            fail_with: None,
        }
    }
}

#[derive(Clone)]
struct AppState {
    db: Db,
    auth_header: Arc<str>,
    fail_with: Option<StatusCode>,
    next_number: Arc<AtomicU64>,
}

pub fn app(config: MockConfig) -> Router {
    let creds = format!("{}:{}", config.user_name, config.password);
    let auth_header = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(creds)
    );
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        auth_header: auth_header.into(),
        fail_with: config.fail_with,
        next_number: Arc::new(AtomicU64::new(FIRST_NUMBER)),
    };
    Router::new()
        .route("/api/now/v2/table/{table}", get(list_records).post(create_record))
        .route(
            "/api/now/v2/table/{table}/{sys_id}",
            get(get_record).put(update_record),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

fn check_request(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    if let Some(status) = state.fail_with {
        return Err(status);
    }
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == &*state.auth_header);
    if !authorized {
        tracing::warn!("rejecting request with bad credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

fn host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
}

async fn list_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    check_request(&state, &headers)?;

    let limit = match params.get("sysparm_limit") {
        Some(raw) => raw.parse::<usize>().map_err(|_| StatusCode::BAD_REQUEST)?,
        None => usize::MAX,
    };
    let filters: Vec<(&String, &String)> = params
        .iter()
        .filter(|(key, _)| !key.starts_with("sysparm_"))
        .collect();

    let db = state.db.read().await;
    let rows: Vec<Value> = db
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter(|row| filters.iter().all(|(key, want)| field_matches(row, key, want)))
                .take(limit)
                .cloned()
                .map(Value::Object)
                .collect()
        })
        .unwrap_or_default();
    Ok(Json(json!({ "result": rows })))
}

async fn get_record(
    State(state): State<AppState>,
    Path((table, sys_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    check_request(&state, &headers)?;

    let db = state.db.read().await;
    let row = find(&db, &table, &sys_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "result": row })))
}

async fn create_record(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    check_request(&state, &headers)?;
    let Value::Object(input) = input else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let mut row = Record::new();
    for (key, value) in [
        ("active", "true"),
        ("state", "1"),
        ("impact", "3"),
        ("urgency", "3"),
    ] {
        row.insert(key.to_string(), Value::String(value.to_string()));
    }
    apply(&mut row, input, host(&headers));

    let sys_id = Uuid::new_v4().simple().to_string();
    let seq = state.next_number.fetch_add(1, Ordering::SeqCst);
    row.insert("sys_id".to_string(), Value::String(sys_id.clone()));
    row.insert(
        "number".to_string(),
        Value::String(format!("{}{seq:07}", number_prefix(&table))),
    );

    tracing::info!(%table, %sys_id, "record created");
    state
        .db
        .write()
        .await
        .entry(table)
        .or_default()
        .push(row.clone());
    Ok((StatusCode::CREATED, Json(json!({ "result": row }))))
}

async fn update_record(
    State(state): State<AppState>,
    Path((table, sys_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    check_request(&state, &headers)?;
    let Value::Object(input) = input else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let mut db = state.db.write().await;
    let row = db
        .get_mut(&table)
        .and_then(|rows| rows.iter_mut().find(|row| row["sys_id"] == sys_id.as_str()))
        .ok_or(StatusCode::NOT_FOUND)?;
    apply(row, input, host(&headers));

    tracing::info!(%table, %sys_id, "record updated");
    Ok(Json(json!({ "result": row })))
}

fn find<'a>(
    db: &'a HashMap<String, Vec<Record>>,
    table: &str,
    sys_id: &str,
) -> Option<&'a Record> {
    db.get(table)?.iter().find(|row| row["sys_id"] == sys_id)
}

/// Merge writable fields from `input` into `row` and refresh derived fields.
fn apply(row: &mut Record, input: Record, host: &str) {
    for (key, value) in input {
        if READ_ONLY_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let value = match REFERENCE_FIELDS.iter().find(|(field, _)| *field == key) {
            Some((_, target)) => reference(host, target, &value),
            None => stringify(value),
        };
        row.insert(key, value);
    }

    let closed = matches!(row.get("state").and_then(Value::as_str), Some("6" | "7" | "8"));
    row.insert(
        "active".to_string(),
        Value::String((!closed).to_string()),
    );

    let impact = row.get("impact").and_then(Value::as_str).unwrap_or("3");
    let urgency = row.get("urgency").and_then(Value::as_str).unwrap_or("3");
    let priority = priority(impact, urgency);
    row.insert("priority".to_string(), Value::String(priority.to_string()));
}

/// Scalars become strings, the way instances return every column.
fn stringify(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}

fn reference(host: &str, target: &str, value: &Value) -> Value {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };
    if id.is_empty() {
        return Value::String(id);
    }
    json!({
        "link": format!("http://{host}/api/now/table/{target}/{id}"),
        "value": id,
    })
}

/// Standard impact × urgency matrix; out-of-range input counts as low (3).
fn priority(impact: &str, urgency: &str) -> u8 {
    let level = |s: &str| match s {
        "1" => 1,
        "2" => 2,
        _ => 3,
    };
    let sum = level(impact) + level(urgency);
    // 1+1 -> 1, 1+2 -> 2, 2+2 or 1+3 -> 3, 2+3 -> 4, 3+3 -> 5
    sum - 1
}

fn number_prefix(table: &str) -> String {
    match table {
        "incident" => "INC".to_string(),
        other => other.chars().take(3).collect::<String>().to_uppercase(),
    }
}

fn field_matches(row: &Record, key: &str, want: &str) -> bool {
    match row.get(key) {
        Some(Value::String(s)) => s == want,
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_str) == Some(want),
        _ => false,
    }
}
