//! Per-client fixed-window rate limiting for `/sample`: a configurable
//! window and budget per client key; exceeding it yields the seconds left
//! in the window for the `Retry-After` header.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window: Duration,
    budget: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, budget: u32) -> Self {
        Self { windows: Mutex::new(HashMap::new()), window, budget }
    }

    /// Returns `Ok(())` if `client_key` still has budget in its current
    /// window, else `Err(retry_after_sec)`.
    pub async fn check(&self, client_key: &str) -> Result<(), u64> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let window = windows.entry(client_key.to_string()).or_insert_with(|| Window { started_at: now, count: 0 });

        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.budget {
            let remaining = self.window.saturating_sub(now.duration_since(window.started_at));
            return Err(remaining.as_secs().max(1));
        }

        window.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_up_to_budget() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_err());
    }

    #[tokio::test]
    async fn separate_clients_have_separate_budgets() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("b").await.is_ok());
        assert!(limiter.check("a").await.is_err());
    }

    #[tokio::test]
    async fn budget_resets_after_the_window_elapses() {
        let limiter = RateLimiter::new(Duration::from_millis(20), 1);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_err());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("a").await.is_ok());
    }
}
