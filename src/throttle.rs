//! Per-IP throttle for the diagnosis endpoint.
//!
//! Each diagnosis request spends upstream generation quota, so the endpoint
//! is throttled well before the provider starts refusing. State lives in
//! `AppState` (for single-instance deployments; multi-instance needs Redis
//! or similar), passed by reference rather than a module-level singleton.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

const MAX_REQUESTS: u32 = 5; // Max diagnosis requests per window
const WINDOW_SECS: u64 = 600; // Window duration in seconds

#[derive(Clone, Default)]
pub struct ThrottleState {
    entries: Arc<Mutex<HashMap<String, ThrottleEntry>>>,
}

struct ThrottleEntry {
    count: u32,
    window_start: Instant,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the key is throttled. Returns Ok(remaining) or Err with the
    /// time until the window resets.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(WINDOW_SECS);

        let entry = entries.entry(key.to_string()).or_insert(ThrottleEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= MAX_REQUESTS {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(MAX_REQUESTS - entry.count)
    }

    /// Drop entries whose window is long gone.
    pub async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(WINDOW_SECS * 2);

        entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
    }
}

/// Purges stale throttle entries every five minutes.
pub fn spawn_cleanup_worker(throttle: ThrottleState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            throttle.cleanup().await;
        }
    });
}

pub async fn throttle_diagnosis(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = addr.ip().to_string();

    match state.throttle.check(&ip).await {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, remaining = remaining, "Diagnosis throttle check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            let secs = retry_after.as_secs().max(1);
            tracing::warn!(ip = %ip, retry_after_secs = secs, "Diagnosis throttle exceeded");
            Err(AppError::Throttled {
                retry_after_secs: secs,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let throttle = ThrottleState::new();

        for i in 0..MAX_REQUESTS {
            let result = throttle.check("10.0.0.1").await;
            assert!(result.is_ok(), "Request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn blocks_requests_over_the_limit_with_retry_hint() {
        let throttle = ThrottleState::new();

        for _ in 0..MAX_REQUESTS {
            let _ = throttle.check("10.0.0.1").await;
        }

        let result = throttle.check("10.0.0.1").await;
        let retry_after = result.expect_err("request over limit should be blocked");
        assert!(retry_after <= Duration::from_secs(WINDOW_SECS));
    }

    #[tokio::test]
    async fn different_clients_have_separate_limits() {
        let throttle = ThrottleState::new();

        for _ in 0..MAX_REQUESTS {
            let _ = throttle.check("10.0.0.1").await;
        }

        let result = throttle.check("10.0.0.2").await;
        assert!(result.is_ok(), "Different client should have separate limit");
    }
}
