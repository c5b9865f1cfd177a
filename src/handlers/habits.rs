use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::DeleteResponse;
use crate::error::{AppError, AppResult};
use crate::models::habit::{CreateHabitRequest, Habit, UpdateHabitRequest};
use crate::AppState;

pub async fn list_habits(State(state): State<AppState>) -> AppResult<Json<Vec<Habit>>> {
    let habits = sqlx::query_as::<_, Habit>("SELECT * FROM habits ORDER BY created_at ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(habits))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<Habit>> {
    let habit = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = $1")
        .bind(habit_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Habit not found".into()))?;

    Ok(Json(habit))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(body): Json<CreateHabitRequest>,
) -> AppResult<Json<Habit>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let habit = sqlx::query_as::<_, Habit>(
        r#"
        INSERT INTO habits (id, name, unit, color)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.name)
    .bind(&body.unit)
    .bind(&body.color)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(habit))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<Uuid>,
    Json(body): Json<UpdateHabitRequest>,
) -> AppResult<Json<Habit>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let habit = sqlx::query_as::<_, Habit>(
        r#"
        UPDATE habits SET
            name = COALESCE($2, name),
            unit = COALESCE($3, unit),
            color = COALESCE($4, color),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(habit_id)
    .bind(&body.name)
    .bind(&body.unit)
    .bind(&body.color)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Habit not found".into()))?;

    Ok(Json(habit))
}

/// Deleting a habit leaves its logs in place as orphans; log reads filter
/// them out rather than cascading the delete.
pub async fn delete_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let result = sqlx::query("DELETE FROM habits WHERE id = $1")
        .bind(habit_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Habit not found".into()));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        id: habit_id,
    }))
}
