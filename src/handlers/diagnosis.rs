//! The diagnosis pipeline endpoint: Engine -> Prompt -> Orchestrator ->
//! Repository, in that order, one step at a time.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;

use crate::analytics::correlation::correlate;
use crate::analytics::prompt::{build_diagnosis_prompt, PromptContext};
use crate::dto::{
    DiagnoseRequest, DiagnoseResponse, DiagnosisScopeQuery, HabitLogInput, LatestDiagnosisResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::diagnosis::Diagnosis;
use crate::services::generation::generate_with_fallback;
use crate::store::diagnoses;
use crate::AppState;

pub async fn create_diagnosis(
    State(state): State<AppState>,
    Json(body): Json<DiagnoseRequest>,
) -> AppResult<Json<DiagnoseResponse>> {
    let definitions = body
        .habit_definitions
        .ok_or_else(|| AppError::Validation("habitDefinitions is required".into()))?;
    let logs = body
        .habit_logs
        .ok_or_else(|| AppError::Validation("habitLogs is required".into()))?;
    let records = body
        .daily_records
        .ok_or_else(|| AppError::Validation("dailyRecords is required".into()))?;

    let scope_habit_name = match body.habit_id {
        Some(habit_id) => Some(
            definitions
                .iter()
                .find(|d| d.id == habit_id)
                .map(|d| d.name.as_str())
                .ok_or_else(|| {
                    AppError::Validation(
                        "habitId does not match any supplied habit definition".into(),
                    )
                })?,
        ),
        None => None,
    };

    let stats = correlate(&logs, &records, definitions.len(), body.habit_id);

    let scoped: Vec<&HabitLogInput> = match body.habit_id {
        Some(habit_id) => logs.iter().filter(|l| l.habit_id == habit_id).collect(),
        None => logs.iter().collect(),
    };
    let success_count = scoped.iter().filter(|l| l.completed).count();

    let prompt = build_diagnosis_prompt(
        &stats,
        &PromptContext {
            scope_habit_name,
            habit_count: definitions.len(),
            log_count: logs.len(),
            record_count: records.len(),
            total_attempts: scoped.len(),
            success_count,
        },
    );

    let analysis = generate_with_fallback(
        &state.generator,
        &state.config.generation_models,
        &prompt,
        &state.fallback_policy,
    )
    .await?;

    // Staleness markers: what the log state looked like when this snapshot
    // was produced.
    let last_log_date = scoped.iter().map(|l| l.date).max();
    let diagnosis = diagnoses::save(
        &state.db,
        body.habit_id,
        &analysis,
        last_log_date,
        scoped.len() as i32,
    )
    .await?;

    tracing::info!(
        diagnosis_id = %diagnosis.id,
        scope = ?body.habit_id,
        log_count = scoped.len(),
        "diagnosis stored"
    );

    Ok(Json(DiagnoseResponse { analysis }))
}

pub async fn latest_diagnosis(
    State(state): State<AppState>,
    Query(query): Query<DiagnosisScopeQuery>,
) -> AppResult<Json<LatestDiagnosisResponse>> {
    let diagnosis = diagnoses::latest(&state.db, query.habit_id).await?;
    let (current_log_count, current_last_log_date) =
        diagnoses::current_log_state(&state.db, query.habit_id).await?;

    let is_stale = is_stale(
        diagnosis.as_ref(),
        current_log_count,
        current_last_log_date,
    );

    Ok(Json(LatestDiagnosisResponse {
        diagnosis,
        is_stale,
        current_log_count,
        current_last_log_date,
    }))
}

/// A snapshot is stale once the scope's log state has moved past the
/// markers recorded with it. No diagnosis at all counts as stale: a fresh
/// one is warranted.
fn is_stale(
    diagnosis: Option<&Diagnosis>,
    current_log_count: i64,
    current_last_log_date: Option<NaiveDate>,
) -> bool {
    match diagnosis {
        None => true,
        Some(d) => {
            i64::from(d.log_count_at_diagnosis) != current_log_count
                || d.last_log_date != current_last_log_date
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot(log_count: i32, last_log_date: Option<&str>) -> Diagnosis {
        Diagnosis {
            id: Uuid::new_v4(),
            habit_id: None,
            analysis: "fine".into(),
            last_log_date: last_log_date.map(|d| d.parse().unwrap()),
            log_count_at_diagnosis: log_count,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_diagnosis_is_stale() {
        assert!(is_stale(None, 0, None));
    }

    #[test]
    fn matching_markers_are_fresh() {
        let d = snapshot(4, Some("2026-03-04"));
        assert!(!is_stale(Some(&d), 4, Some("2026-03-04".parse().unwrap())));
    }

    #[test]
    fn new_logs_or_newer_dates_make_it_stale() {
        let d = snapshot(4, Some("2026-03-04"));
        assert!(is_stale(Some(&d), 5, Some("2026-03-04".parse().unwrap())));
        assert!(is_stale(Some(&d), 4, Some("2026-03-05".parse().unwrap())));
        assert!(is_stale(Some(&d), 4, None));
    }
}
