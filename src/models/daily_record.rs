use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One wellbeing record per calendar day. Sleep duration is derived from
/// `sleep_start`/`sleep_end` at aggregation time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: Uuid,
    #[serde(rename = "date")]
    pub record_date: NaiveDate,
    pub sleep_start: Option<String>,
    pub sleep_end: Option<String>,
    pub mood_morning: Option<i32>,
    pub mood_noon: Option<i32>,
    pub mood_evening: Option<i32>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDailyRecordRequest {
    pub date: Option<NaiveDate>,
    pub sleep_start: Option<String>,
    pub sleep_end: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood_morning: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood_noon: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood_evening: Option<i32>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecordQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
