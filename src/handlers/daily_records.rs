use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::analytics::correlation::parse_clock;
use crate::error::{AppError, AppResult};
use crate::models::daily_record::{DailyRecord, DailyRecordQuery, UpsertDailyRecordRequest};
use crate::AppState;

/// Upsert by date: at most one wellbeing record per calendar day. Absent
/// fields keep their stored values, so a morning mood entry and an evening
/// sleep entry merge instead of clobbering each other.
pub async fn upsert_daily_record(
    State(state): State<AppState>,
    Json(body): Json<UpsertDailyRecordRequest>,
) -> AppResult<Json<DailyRecord>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    for (field, clock) in [
        ("sleepStart", body.sleep_start.as_deref()),
        ("sleepEnd", body.sleep_end.as_deref()),
    ] {
        if let Some(clock) = clock {
            if parse_clock(clock).is_none() {
                return Err(AppError::Validation(format!(
                    "{field} must be a valid HH:MM clock time"
                )));
            }
        }
    }

    let record_date = body.date.unwrap_or_else(|| Utc::now().date_naive());

    let record = sqlx::query_as::<_, DailyRecord>(
        r#"
        INSERT INTO daily_records
            (id, record_date, sleep_start, sleep_end, mood_morning, mood_noon, mood_evening, weather, temperature, memo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (record_date) DO UPDATE SET
            sleep_start = COALESCE($3, daily_records.sleep_start),
            sleep_end = COALESCE($4, daily_records.sleep_end),
            mood_morning = COALESCE($5, daily_records.mood_morning),
            mood_noon = COALESCE($6, daily_records.mood_noon),
            mood_evening = COALESCE($7, daily_records.mood_evening),
            weather = COALESCE($8, daily_records.weather),
            temperature = COALESCE($9, daily_records.temperature),
            memo = COALESCE($10, daily_records.memo),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record_date)
    .bind(&body.sleep_start)
    .bind(&body.sleep_end)
    .bind(body.mood_morning)
    .bind(body.mood_noon)
    .bind(body.mood_evening)
    .bind(&body.weather)
    .bind(body.temperature)
    .bind(&body.memo)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(record))
}

pub async fn list_daily_records(
    State(state): State<AppState>,
    Query(query): Query<DailyRecordQuery>,
) -> AppResult<Json<Vec<DailyRecord>>> {
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    let records = sqlx::query_as::<_, DailyRecord>(
        r#"
        SELECT * FROM daily_records
        WHERE record_date BETWEEN $1 AND $2
        ORDER BY record_date DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(records))
}
