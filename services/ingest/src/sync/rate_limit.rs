use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::RateLimitSnapshot;

pub const DEFAULT_THRESHOLD: i64 = 50;
pub const DEFAULT_BUFFER: Duration = Duration::from_secs(1);

/// Turns an upstream quota snapshot into a pause before the next request.
#[derive(Debug, Clone)]
pub struct RateLimitGovernor {
    threshold: i64,
    buffer: Duration,
}

impl Default for RateLimitGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_BUFFER)
    }
}

impl RateLimitGovernor {
    pub fn new(threshold: i64, buffer: Duration) -> Self {
        Self { threshold, buffer }
    }

    pub fn compute_delay(&self, snapshot: Option<&RateLimitSnapshot>) -> Duration {
        self.compute_delay_at(snapshot, Utc::now())
    }

    /// Zero when there is no snapshot or quota is above the threshold; otherwise
    /// the time until reset plus the buffer, floored at zero.
    pub fn compute_delay_at(
        &self,
        snapshot: Option<&RateLimitSnapshot>,
        now: DateTime<Utc>,
    ) -> Duration {
        let Some(snapshot) = snapshot else {
            return Duration::ZERO;
        };

        if snapshot.remaining > self.threshold {
            return Duration::ZERO;
        }

        let reset_at = match DateTime::parse_from_rfc3339(&snapshot.reset_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(
                    reset_at = %snapshot.reset_at,
                    error = %e,
                    "rate limit reset time invalid, not delaying"
                );
                return Duration::ZERO;
            }
        };

        let buffer = chrono::Duration::from_std(self.buffer).unwrap_or_else(|_| chrono::Duration::zero());
        // to_std() fails on negative spans, i.e. the reset is already behind us
        (reset_at - now + buffer).to_std().unwrap_or(Duration::ZERO)
    }

    /// Sleep for the computed delay. Returns how long it slept.
    pub async fn wait(&self, snapshot: Option<&RateLimitSnapshot>) -> Duration {
        let delay = self.compute_delay(snapshot);
        if delay.is_zero() {
            return delay;
        }

        if let Some(s) = snapshot {
            tracing::warn!(
                delay_ms = delay.as_millis() as u64,
                remaining = s.remaining,
                reset_at = %s.reset_at,
                "rate limit reached, delaying"
            );
        }
        tokio::time::sleep(delay).await;
        delay
    }
}
