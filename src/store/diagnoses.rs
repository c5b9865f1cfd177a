//! Append-only diagnosis history, one logical "latest" per scope.
//!
//! A scope is either a single habit (`Some(habit_id)`) or the aggregate of
//! all habits (`None`). Rows are never updated; a newer row with the same
//! scope supersedes older ones at read time by `created_at`. Staleness is
//! advisory only and decided by callers.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::diagnosis::Diagnosis;

pub async fn save(
    pool: &PgPool,
    scope: Option<Uuid>,
    analysis: &str,
    last_log_date: Option<NaiveDate>,
    log_count_at_diagnosis: i32,
) -> AppResult<Diagnosis> {
    let diagnosis = sqlx::query_as::<_, Diagnosis>(
        r#"
        INSERT INTO diagnoses (id, habit_id, analysis, last_log_date, log_count_at_diagnosis)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(scope)
    .bind(analysis)
    .bind(last_log_date)
    .bind(log_count_at_diagnosis)
    .fetch_one(pool)
    .await?;

    Ok(diagnosis)
}

pub async fn latest(pool: &PgPool, scope: Option<Uuid>) -> AppResult<Option<Diagnosis>> {
    let diagnosis = sqlx::query_as::<_, Diagnosis>(
        r#"
        SELECT * FROM diagnoses
        WHERE habit_id IS NOT DISTINCT FROM $1
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(scope)
    .fetch_optional(pool)
    .await?;

    Ok(diagnosis)
}

/// Current log state for a scope: `(count, newest log date)`. Callers
/// compare this against a stored snapshot to decide whether a fresh
/// diagnosis is warranted.
pub async fn current_log_state(
    pool: &PgPool,
    scope: Option<Uuid>,
) -> AppResult<(i64, Option<NaiveDate>)> {
    let state = if let Some(habit_id) = scope {
        sqlx::query_as::<_, (i64, Option<NaiveDate>)>(
            "SELECT COUNT(*), MAX(log_date) FROM habit_logs WHERE habit_id = $1",
        )
        .bind(habit_id)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as::<_, (i64, Option<NaiveDate>)>(
            "SELECT COUNT(*), MAX(log_date) FROM habit_logs",
        )
        .fetch_one(pool)
        .await?
    };

    Ok(state)
}

// DB-backed tests run only when TEST_DATABASE_URL points at a disposable
// Postgres instance; they are skipped otherwise.
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.expect("connect test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");
        Some(pool)
    }

    #[tokio::test]
    async fn second_save_wins_latest_for_the_same_scope() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let scope = Some(Uuid::new_v4());

        save(&pool, scope, "first analysis", None, 3).await.unwrap();
        save(&pool, scope, "second analysis", None, 5)
            .await
            .unwrap();

        let latest = latest(&pool, scope).await.unwrap().unwrap();
        assert_eq!(latest.analysis, "second analysis");
        assert_eq!(latest.log_count_at_diagnosis, 5);
    }

    #[tokio::test]
    async fn aggregate_and_habit_scopes_are_independent() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let habit_scope = Some(Uuid::new_v4());

        save(&pool, None, "aggregate analysis", None, 10)
            .await
            .unwrap();
        save(&pool, habit_scope, "habit analysis", None, 2)
            .await
            .unwrap();

        let aggregate = latest(&pool, None).await.unwrap().unwrap();
        assert_eq!(aggregate.analysis, "aggregate analysis");

        let habit = latest(&pool, habit_scope).await.unwrap().unwrap();
        assert_eq!(habit.analysis, "habit analysis");
    }
}
