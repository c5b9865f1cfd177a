use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::dto::ErrorResponse;

/// Fixed daily allowance surfaced in quota error messages.
const DAILY_GENERATION_QUOTA: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many diagnosis requests")]
    Throttled { retry_after_secs: u64 },

    #[error("Generation quota exceeded")]
    QuotaExceeded { retry_after_secs: u64 },

    #[error("Generation credential rejected")]
    CredentialInvalid,

    #[error("No candidate model available")]
    ProviderUnavailable,

    #[error("Generation failed: {detail}")]
    TransientProvider { detail: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Minutes-until-retry shown to users: ceil(secs / 60).
fn eta_minutes(retry_after_secs: u64) -> u64 {
    retry_after_secs.div_ceil(60)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail, retry_after) = match &self {
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg.clone(),
                "validation",
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found", None),
            AppError::Throttled { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "Too many diagnosis requests. Try again in about {} minute(s).",
                    eta_minutes(*retry_after_secs)
                ),
                "throttled",
                Some(*retry_after_secs),
            ),
            AppError::QuotaExceeded { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "AI diagnosis limit reached ({} requests/day). Try again in about {} minute(s).",
                    DAILY_GENERATION_QUOTA,
                    eta_minutes(*retry_after_secs)
                ),
                "quota_exceeded",
                Some(*retry_after_secs),
            ),
            AppError::CredentialInvalid => (
                StatusCode::UNAUTHORIZED,
                "The AI service credential is invalid or missing.".into(),
                "credential_invalid",
                None,
            ),
            AppError::ProviderUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The AI diagnosis service is currently unavailable. Please try again later.".into(),
                "provider_unavailable",
                None,
            ),
            AppError::TransientProvider { detail } => {
                tracing::error!(detail = %detail, "Generation provider error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong while generating the diagnosis. Please try again later."
                        .into(),
                    "provider_error",
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                    "internal",
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                    "internal",
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            detail: detail.to_string(),
            retry_after,
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn eta_rounds_up_to_whole_minutes() {
        assert_eq!(eta_minutes(45), 1);
        assert_eq!(eta_minutes(60), 1);
        assert_eq!(eta_minutes(61), 2);
        assert_eq!(eta_minutes(0), 0);
    }

    #[tokio::test]
    async fn quota_error_maps_to_429_with_retry_after() {
        let response = AppError::QuotaExceeded {
            retry_after_secs: 45,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryAfter"], 45);
        assert_eq!(body["detail"], "quota_exceeded");
        assert!(body["error"].as_str().unwrap().contains("20 requests/day"));
    }

    #[tokio::test]
    async fn provider_error_never_leaks_raw_text() {
        let response = AppError::TransientProvider {
            detail: "model x: upstream exploded with secret gunk".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "provider_error");
        assert!(!body["error"].as_str().unwrap().contains("exploded"));
    }

    #[tokio::test]
    async fn credential_error_maps_to_401() {
        let response = AppError::CredentialInvalid.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
