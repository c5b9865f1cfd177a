//! Request/response DTOs for the diagnosis pipeline API.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Wire format is camelCase (the dashboard's document shape)
//!
//! The diagnosis endpoint takes the documents it analyzes in the request
//! body: the caller owns the store query, the pipeline owns the math.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::diagnosis::Diagnosis;
use crate::models::{daily_record::DailyRecord, habit_log::HabitLog};

fn default_true() -> bool {
    true
}

/// POST /api/diagnosis
///
/// `habit_id = None` requests the aggregate (all-habits) scope. The three
/// arrays are required; their absence is a validation error rather than an
/// empty-input run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseRequest {
    pub habit_id: Option<Uuid>,
    pub habit_definitions: Option<Vec<HabitDefinitionInput>>,
    pub habit_logs: Option<Vec<HabitLogInput>>,
    pub daily_records: Option<Vec<DailyRecordInput>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDefinitionInput {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitLogInput {
    pub habit_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    #[allow(dead_code)]
    pub value: Option<f64>,
    #[serde(default)]
    #[allow(dead_code)]
    pub notes: Option<String>,
    /// Older documents predate this field; absence means achieved.
    #[serde(default = "default_true")]
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecordInput {
    pub date: NaiveDate,
    #[serde(default)]
    pub sleep_start: Option<String>,
    #[serde(default)]
    pub sleep_end: Option<String>,
    #[serde(default)]
    pub mood_morning: Option<i32>,
    #[serde(default)]
    pub mood_noon: Option<i32>,
    #[serde(default)]
    pub mood_evening: Option<i32>,
}

impl From<HabitLog> for HabitLogInput {
    fn from(log: HabitLog) -> Self {
        Self {
            habit_id: log.habit_id,
            date: log.log_date,
            value: log.value,
            notes: log.notes,
            completed: log.completed,
        }
    }
}

impl From<DailyRecord> for DailyRecordInput {
    fn from(record: DailyRecord) -> Self {
        Self {
            date: record.record_date,
            sleep_start: record.sleep_start,
            sleep_end: record.sleep_end,
            mood_morning: record.mood_morning,
            mood_noon: record.mood_noon,
            mood_evening: record.mood_evening,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiagnoseResponse {
    pub analysis: String,
}

/// GET /api/diagnosis/latest
///
/// Staleness is advisory: the stored snapshot is compared against the
/// current log state for the scope, nothing is invalidated server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestDiagnosisResponse {
    pub diagnosis: Option<Diagnosis>,
    pub is_stale: bool,
    pub current_log_count: i64,
    pub current_last_log_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisScopeQuery {
    pub habit_id: Option<Uuid>,
}

/// Stable error envelope — every error response uses this shape.
///
/// `error` is the user-facing message; `detail` is a sanitized category
/// string. Raw provider/database text never leaves the logs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Standard delete confirmation
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}
