//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use paperlens_common::{config::RateLimitConfig, errors::AppError};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the quota it enforces, for error reporting
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

impl RateLimitState {
    /// Create a new rate limiter
    pub fn new(config: &RateLimitConfig) -> Result<Self, AppError> {
        let per_second = non_zero(config.requests_per_second, "rate_limit.requests_per_second")?;
        let burst = non_zero(config.burst, "rate_limit.burst")?;
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            requests_per_second: config.requests_per_second,
        })
    }
}

fn non_zero(value: u32, name: &str) -> Result<NonZeroU32, AppError> {
    NonZeroU32::new(value).ok_or_else(|| AppError::Configuration {
        message: format!("{} must be greater than zero", name),
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: state.requests_per_second,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let state = RateLimitState::new(&RateLimitConfig::default()).unwrap();
        assert!(state.limiter.check().is_ok());
    }

    #[test]
    fn test_burst_is_enforced() {
        let config = RateLimitConfig {
            requests_per_second: 1,
            burst: 2,
            enabled: true,
        };
        let state = RateLimitState::new(&config).unwrap();
        assert!(state.limiter.check().is_ok());
        assert!(state.limiter.check().is_ok());
        assert!(state.limiter.check().is_err());
    }

    #[test]
    fn test_zero_quota_rejected() {
        let config = RateLimitConfig {
            requests_per_second: 0,
            burst: 10,
            enabled: true,
        };
        assert!(matches!(
            RateLimitState::new(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
