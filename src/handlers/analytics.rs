use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::analytics::correlation::{correlate, CorrelationStats};
use crate::dto::{DailyRecordInput, HabitLogInput};
use crate::error::AppResult;
use crate::models::{daily_record::DailyRecord, habit_log::HabitLog};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub habit_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Correlation statistics over store-held logs and records, for the
/// dashboard charts. Same engine as the diagnosis pipeline, without the
/// generation step.
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<CorrelationStats>> {
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    let total_habits = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM habits")
        .fetch_one(&state.db)
        .await? as usize;

    let logs = sqlx::query_as::<_, HabitLog>(
        r#"
        SELECT l.* FROM habit_logs l
        WHERE l.log_date BETWEEN $1 AND $2
          AND EXISTS(SELECT 1 FROM habits h WHERE h.id = l.habit_id)
        ORDER BY l.log_date ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let records = sqlx::query_as::<_, DailyRecord>(
        r#"
        SELECT * FROM daily_records
        WHERE record_date BETWEEN $1 AND $2
        ORDER BY record_date ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let logs: Vec<HabitLogInput> = logs.into_iter().map(Into::into).collect();
    let records: Vec<DailyRecordInput> = records.into_iter().map(Into::into).collect();

    Ok(Json(correlate(
        &logs,
        &records,
        total_habits,
        query.habit_id,
    )))
}
