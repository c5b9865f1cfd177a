//! Text-generation orchestration: one diagnosis string out of an ordered
//! chain of candidate models.
//!
//! The fallback loop is strictly sequential. Quota consumption on one model
//! must be observed before the next candidate is tried, so there is never a
//! speculative parallel request.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;

/// Failure of a single generation attempt: an HTTP-like status class when
/// one was observed, plus the raw provider message (logs only, never the
/// client).
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

/// Seam for the generation backend so the fallback loop can be exercised
/// with a scripted stub.
pub trait TextGenerator {
    /// One generation attempt against a single candidate model.
    fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// Model unknown to the provider; worth trying the next candidate.
    NotFound,
    /// Quota or rate limit. Account-wide exhaustion makes further
    /// candidates pointless; a per-model limit does not.
    Quota {
        retry_after_secs: u64,
        account_wide: bool,
    },
    Credential,
    /// Everything else aborts the chain rather than masking a real bug
    /// behind silent fallback.
    Other,
}

/// Classification policy. Provider wording changes are a marker edit here,
/// not string matching scattered through the loop.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub quota_markers: Vec<String>,
    pub account_quota_markers: Vec<String>,
    pub not_found_markers: Vec<String>,
    pub credential_markers: Vec<String>,
    pub default_retry_after_secs: u64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            quota_markers: vec!["quota".into(), "rate limit".into(), "rate_limit".into()],
            account_quota_markers: vec!["billing".into(), "account".into()],
            not_found_markers: vec!["not_found_error".into(), "model not found".into()],
            credential_markers: vec!["invalid x-api-key".into(), "authentication_error".into()],
            default_retry_after_secs: 60,
        }
    }
}

impl FallbackPolicy {
    pub fn classify(&self, error: &ProviderError) -> FailureClass {
        let message = error.message.to_lowercase();
        let matches_any = |markers: &[String]| markers.iter().any(|m| message.contains(m.as_str()));

        if error.status == Some(404) || matches_any(&self.not_found_markers) {
            return FailureClass::NotFound;
        }
        if error.status == Some(429) || matches_any(&self.quota_markers) {
            return FailureClass::Quota {
                retry_after_secs: parse_retry_after_secs(&error.message)
                    .unwrap_or(self.default_retry_after_secs),
                account_wide: matches_any(&self.account_quota_markers),
            };
        }
        if matches!(error.status, Some(401) | Some(403))
            || matches_any(&self.credential_markers)
        {
            return FailureClass::Credential;
        }
        FailureClass::Other
    }
}

/// Retry-after seconds embedded in an error payload: the first explicit
/// `<n>s` token in the message, else a structured `retryDelay`-style field
/// in a JSON body, else `None`.
pub fn parse_retry_after_secs(message: &str) -> Option<u64> {
    if let Some(secs) = first_seconds_token(message) {
        return Some(secs);
    }
    if let Ok(value) = serde_json::from_str::<Value>(message) {
        return find_retry_field(&value);
    }
    None
}

fn first_seconds_token(text: &str) -> Option<u64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b's' || bytes[i] == b'S') {
                if let Ok(seconds) = text[start..i].parse::<f64>() {
                    return Some(seconds.ceil() as u64);
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

fn find_retry_field(value: &Value) -> Option<u64> {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let is_retry_key = key.eq_ignore_ascii_case("retryDelay")
                    || key.eq_ignore_ascii_case("retry_after")
                    || key.eq_ignore_ascii_case("retryAfter");
                if is_retry_key {
                    match nested {
                        Value::Number(n) => return n.as_f64().map(|f| f.ceil() as u64),
                        Value::String(s) => {
                            if let Some(secs) = first_seconds_token(s) {
                                return Some(secs);
                            }
                            if let Ok(secs) = s.parse::<f64>() {
                                return Some(secs.ceil() as u64);
                            }
                        }
                        _ => {}
                    }
                }
                if let Some(found) = find_retry_field(nested) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(find_retry_field),
        _ => None,
    }
}

/// Walk the candidate chain in order until one model produces text.
///
/// Not-found and per-model quota failures move on to the next candidate;
/// account-wide quota, credential, and generic failures abort immediately.
/// A fully exhausted chain surfaces the dominant failure class.
pub async fn generate_with_fallback<G: TextGenerator>(
    generator: &G,
    models: &[String],
    prompt: &str,
    policy: &FallbackPolicy,
) -> Result<String, AppError> {
    if models.is_empty() {
        return Err(AppError::ProviderUnavailable);
    }

    let mut quota_failures = 0usize;
    let mut not_found_failures = 0usize;
    let mut last_retry_after = policy.default_retry_after_secs;
    let mut last_message = String::new();

    for model in models {
        let error = match generator.generate(model, prompt).await {
            Ok(text) => {
                tracing::debug!(model = %model, "generation succeeded");
                return Ok(text);
            }
            Err(error) => error,
        };

        last_message = error.message.clone();
        match policy.classify(&error) {
            FailureClass::NotFound => {
                tracing::warn!(model = %model, error = %error.message, "model unavailable, trying next candidate");
                not_found_failures += 1;
            }
            FailureClass::Quota {
                retry_after_secs,
                account_wide,
            } => {
                if account_wide {
                    tracing::warn!(model = %model, retry_after_secs, "account-wide quota exhausted, aborting");
                    return Err(AppError::QuotaExceeded { retry_after_secs });
                }
                tracing::warn!(model = %model, retry_after_secs, "model quota exhausted, trying next candidate");
                quota_failures += 1;
                last_retry_after = retry_after_secs;
            }
            FailureClass::Credential => {
                tracing::error!(model = %model, "generation credential rejected");
                return Err(AppError::CredentialInvalid);
            }
            FailureClass::Other => {
                tracing::error!(model = %model, error = %error.message, "generation failed, aborting fallback chain");
                return Err(AppError::TransientProvider {
                    detail: format!("model {model}: {}", error.message),
                });
            }
        }
    }

    if quota_failures == models.len() {
        return Err(AppError::QuotaExceeded {
            retry_after_secs: last_retry_after,
        });
    }
    if not_found_failures == models.len() {
        return Err(AppError::ProviderUnavailable);
    }
    Err(AppError::TransientProvider {
        detail: format!(
            "all candidates failed [{}]; last error: {last_message}",
            models.join(", ")
        ),
    })
}

/// HTTP client for the messages-style generation API.
#[derive(Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GenerationClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()
            .expect("Failed to build generation HTTP client");
        Self {
            http,
            base_url: config.generation_base_url.clone(),
            api_key: config.generation_api_key.clone(),
        }
    }
}

impl TextGenerator for GenerationClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        async move {
            let response = self
                .http
                .post(&self.base_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&serde_json::json!({
                    "model": model,
                    "max_tokens": 1024,
                    "messages": [{
                        "role": "user",
                        "content": prompt
                    }]
                }))
                .send()
                .await
                .map_err(|e| ProviderError {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError {
                    status: Some(status.as_u16()),
                    message: body,
                });
            }

            let body: Value = response.json().await.map_err(|e| ProviderError {
                status: None,
                message: e.to_string(),
            })?;
            let text = body["content"][0]["text"].as_str().unwrap_or_default();
            if text.is_empty() {
                return Err(ProviderError {
                    status: None,
                    message: "provider response contained no completion text".into(),
                });
            }
            Ok(text.to_string())
        }
    }
}
