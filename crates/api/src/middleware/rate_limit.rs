//! Per-email rate limiting for magic-link requests.
//!
//! Keyed by normalized email so one address cannot be flooded with login
//! emails, regardless of which client asks.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde_json::json;
use std::{num::NonZeroU32, time::Duration};

type EmailRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Allows `attempts` requests per key within `window`, refilling evenly.
pub struct SignInRateLimiter {
    limiter: EmailRateLimiter,
    clock: DefaultClock,
    attempts: u32,
    window_secs: u64,
}

impl SignInRateLimiter {
    pub fn new(attempts: u32, window_secs: u64) -> Self {
        let burst = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
        let period = Duration::from_secs(window_secs.max(1)) / burst.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            attempts: burst.get(),
            window_secs,
        }
    }

    /// Returns `Err(retry_after_secs)` when the key is over its quota.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }

    /// Drops state for keys that have fully replenished.
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
    }
}

impl std::fmt::Debug for SignInRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRateLimiter")
            .field("attempts", &self.attempts)
            .field("window_secs", &self.window_secs)
            .field("tracked_keys", &self.limiter.len())
            .finish()
    }
}

/// 429 response with a Retry-After header.
pub fn rate_limited_response(retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": "Too many sign-in requests. Please try again later.",
        "retry_after": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, header::HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_attempts() {
        let limiter = SignInRateLimiter::new(3, 900);
        for _ in 0..3 {
            assert!(limiter.check("coach@example.com").is_ok());
        }

        let retry_after = limiter.check("coach@example.com").unwrap_err();
        assert!(retry_after >= 1);
        assert!(retry_after <= 300);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SignInRateLimiter::new(1, 900);
        assert!(limiter.check("a@example.com").is_ok());
        assert!(limiter.check("b@example.com").is_ok());
        assert!(limiter.check("a@example.com").is_err());
        assert!(limiter.check("b@example.com").is_err());
    }

    #[test]
    fn test_zero_attempts_still_allows_one() {
        let limiter = SignInRateLimiter::new(0, 60);
        assert!(limiter.check("a@example.com").is_ok());
        assert!(limiter.check("a@example.com").is_err());
    }

    #[test]
    fn test_rate_limited_response() {
        let response = rate_limited_response(42);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
