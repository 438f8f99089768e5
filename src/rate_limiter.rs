//! Keyed attempt throttling.
//!
//! Replaces the in-process login-attempt counters the legacy system kept in
//! global mutable state: counters live in the shared cache (redis when
//! configured), so they survive restarts and are visible across instances.
//! The throttle fails open — if the counter backend is unreachable the
//! attempt is allowed and a warning is logged, since locking every operator
//! out on a cache outage is worse than briefly losing the throttle.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::CacheBackend;
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(900),
        }
    }
}

/// Fixed-window attempt counter with expiry, keyed by caller-supplied
/// identity (e.g. `login:{username}:{ip}`).
#[derive(Clone)]
pub struct AttemptThrottle {
    cache: Arc<dyn CacheBackend>,
    config: ThrottleConfig,
}

impl AttemptThrottle {
    pub fn new(cache: Arc<dyn CacheBackend>, config: ThrottleConfig) -> Self {
        Self { cache, config }
    }

    /// Records one attempt and rejects when the window budget is exhausted.
    pub async fn check(&self, key: &str) -> Result<(), ServiceError> {
        match self.cache.incr(key, self.config.window).await {
            Ok(count) if count > self.config.max_attempts as i64 => {
                warn!(key, count, "attempt budget exhausted");
                Err(ServiceError::RateLimitExceeded)
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(key, error = %e, "throttle backend unavailable; failing open");
                Ok(())
            }
        }
    }

    /// Clears the counter, e.g. after a successful login.
    pub async fn reset(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            warn!(key, error = %e, "failed to reset throttle counter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    #[tokio::test]
    async fn rejects_after_budget_is_spent() {
        let throttle = AttemptThrottle::new(
            Arc::new(InMemoryCache::new()),
            ThrottleConfig {
                max_attempts: 3,
                window: Duration::from_secs(60),
            },
        );

        for _ in 0..3 {
            assert!(throttle.check("login:budi:127.0.0.1").await.is_ok());
        }
        assert!(matches!(
            throttle.check("login:budi:127.0.0.1").await,
            Err(ServiceError::RateLimitExceeded)
        ));

        // Other keys are unaffected.
        assert!(throttle.check("login:sari:127.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn reset_restores_the_budget() {
        let throttle = AttemptThrottle::new(
            Arc::new(InMemoryCache::new()),
            ThrottleConfig {
                max_attempts: 1,
                window: Duration::from_secs(60),
            },
        );

        assert!(throttle.check("login:budi:10.0.0.1").await.is_ok());
        assert!(throttle.check("login:budi:10.0.0.1").await.is_err());
        throttle.reset("login:budi:10.0.0.1").await;
        assert!(throttle.check("login:budi:10.0.0.1").await.is_ok());
    }
}
