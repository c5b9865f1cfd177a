use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A point-in-time AI diagnosis snapshot. `habit_id = None` is the
/// aggregate (all-habits) scope. Rows are never mutated after insert; a
/// newer row with the same scope supersedes at read time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub id: Uuid,
    pub habit_id: Option<Uuid>,
    pub analysis: String,
    /// Date of the newest log considered when this diagnosis was produced.
    pub last_log_date: Option<NaiveDate>,
    /// Number of in-scope logs considered when this diagnosis was produced.
    pub log_count_at_diagnosis: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
