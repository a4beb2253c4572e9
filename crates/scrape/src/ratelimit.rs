// ABOUTME: Per-domain fixed-window rate limiter backed by the key-value store.
// ABOUTME: Fails open: a broken store admits the request rather than blocking scrapes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::KeyValueStore;

/// Counter state for one domain's current window.
#[derive(Debug, Serialize, Deserialize)]
struct Window {
    count: u32,
    reset_at_ms: i64,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in_secs: u64,
}

/// Fixed-window limiter keyed by domain.
///
/// The read-modify-write on the window is not atomic; two concurrent
/// requests can both pass at the boundary. The limiter protects target
/// sites from sustained hammering, not from off-by-one bursts.
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// 60 requests per 60 seconds.
    pub fn default_policy(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, 60, Duration::from_secs(60))
    }

    /// Check and count one request for `domain`. Never errors: store
    /// failures admit the request.
    pub async fn admit(&self, domain: &str) -> Decision {
        let key = format!("ratelimit:{}", domain);
        let now_ms = Utc::now().timestamp_millis();

        let current = match self.store.get(&key).await {
            Ok(value) => value.and_then(|v| serde_json::from_str::<Window>(&v).ok()),
            Err(err) => {
                tracing::warn!(domain, error = %err, "rate limit store read failed, allowing");
                return Decision {
                    allowed: true,
                    remaining: self.max_requests,
                    reset_in_secs: 0,
                };
            }
        };

        let mut window = match current {
            Some(w) if w.reset_at_ms > now_ms => w,
            _ => Window {
                count: 0,
                reset_at_ms: now_ms + self.window.as_millis() as i64,
            },
        };
        window.count += 1;

        let allowed = window.count <= self.max_requests;
        let remaining = self.max_requests.saturating_sub(window.count);
        let reset_in_secs = ((window.reset_at_ms - now_ms).max(0) as u64).div_ceil(1000);

        // The window key expires with the window itself so stale domains
        // cost nothing.
        let ttl_ms = (window.reset_at_ms - now_ms).max(0) as u64;
        if let Ok(serialized) = serde_json::to_string(&window) {
            if let Err(err) = self
                .store
                .set(&key, &serialized, Duration::from_millis(ttl_ms))
                .await
            {
                tracing::warn!(domain, error = %err, "rate limit store write failed");
            }
        }

        Decision {
            allowed,
            remaining,
            reset_in_secs,
        }
    }
}
