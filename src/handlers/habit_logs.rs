use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::dto::DeleteResponse;
use crate::error::{AppError, AppResult};
use crate::models::habit_log::{HabitLog, HabitLogQuery, UpsertHabitLogRequest};
use crate::AppState;

/// Upsert by `(habit_id, date)`: at most one authoritative log per habit
/// per day, enforced here rather than by caller delete-then-insert
/// discipline. A repeated write for the same day overwrites value, notes
/// and completion.
pub async fn upsert_habit_log(
    State(state): State<AppState>,
    Json(body): Json<UpsertHabitLogRequest>,
) -> AppResult<Json<HabitLog>> {
    // The habit reference is soft in the schema; reject dangling ids at the
    // write boundary at least.
    let habit_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM habits WHERE id = $1)")
            .bind(body.habit_id)
            .fetch_one(&state.db)
            .await?;
    if !habit_exists {
        return Err(AppError::NotFound("Habit not found".into()));
    }

    let log_date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let completed = body.completed.unwrap_or(true);

    let log = sqlx::query_as::<_, HabitLog>(
        r#"
        INSERT INTO habit_logs (id, habit_id, log_date, value, notes, completed)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (habit_id, log_date) DO UPDATE SET
            value = EXCLUDED.value,
            notes = EXCLUDED.notes,
            completed = EXCLUDED.completed
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(body.habit_id)
    .bind(log_date)
    .bind(body.value)
    .bind(&body.notes)
    .bind(completed)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(log))
}

pub async fn list_habit_logs(
    State(state): State<AppState>,
    Query(query): Query<HabitLogQuery>,
) -> AppResult<Json<Vec<HabitLog>>> {
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    // Orphaned logs (habit deleted) are filtered out, not deleted.
    let logs = if let Some(habit_id) = query.habit_id {
        sqlx::query_as::<_, HabitLog>(
            r#"
            SELECT l.* FROM habit_logs l
            WHERE l.habit_id = $1 AND l.log_date BETWEEN $2 AND $3
              AND EXISTS(SELECT 1 FROM habits h WHERE h.id = l.habit_id)
            ORDER BY l.log_date DESC
            "#,
        )
        .bind(habit_id)
        .bind(start)
        .bind(end)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, HabitLog>(
            r#"
            SELECT l.* FROM habit_logs l
            WHERE l.log_date BETWEEN $1 AND $2
              AND EXISTS(SELECT 1 FROM habits h WHERE h.id = l.habit_id)
            ORDER BY l.log_date DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&state.db)
        .await?
    };

    Ok(Json(logs))
}

/// Idempotent delete: already-gone logs still return 200.
pub async fn delete_habit_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    sqlx::query("DELETE FROM habit_logs WHERE id = $1")
        .bind(log_id)
        .execute(&state.db)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: true,
        id: log_id,
    }))
}
