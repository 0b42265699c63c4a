//! Request limiter: spaces outgoing API calls by a minimum interval.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Interval used when `options.interval` is absent or not a positive number.
pub const DEFAULT_LIMITER_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct RequestLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RequestLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Reads `interval` (seconds, may be fractional) from the limiter options.
    pub fn from_options(options: &Map<String, Value>) -> Self {
        let interval = options
            .get("interval")
            .and_then(Value::as_f64)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_LIMITER_INTERVAL);
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until at least `interval` has passed since the previous call, then records this one.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let ready_at = last + self.interval;
            if Instant::now() < ready_at {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "step: limiter delaying call");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
