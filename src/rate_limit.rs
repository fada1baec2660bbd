//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-client tracking. Logins carry no
//! password, so this is the only brake on probing for known email addresses.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::api::ApiError;

/// How often idle client entries are dropped from the limiter.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Per-client rate limiter keyed by IP string.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Sustained rate and burst size for login attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginQuota {
    pub per_second: u32,
    pub burst: u32,
}

impl Default for LoginQuota {
    fn default() -> Self {
        Self {
            per_second: 5,
            burst: 10,
        }
    }
}

/// Rate limiting state for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new(quota: LoginQuota) -> Self {
        let per_second = NonZeroU32::new(quota.per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(quota.burst).unwrap_or(per_second);

        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(per_second).allow_burst(burst),
            )),
        }
    }

    /// Forget clients whose bucket has refilled completely.
    pub fn prune(&self) {
        self.login.retain_recent();
        self.login.shrink_to_fit();
    }

    /// Spawn a background task that prunes the limiter every `every`.
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_pruner(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let config = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                config.prune();
                debug!(clients = config.login.len(), "Pruned login rate limiter");
            }
        })
    }
}

/// Identify the client: socket peer first, then the first `X-Forwarded-For` hop.
pub fn client_key(request: &Request) -> Option<String> {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip().to_string());
    }

    let forwarded = request.headers().get("x-forwarded-for")?.to_str().ok()?;
    let first = forwarded.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_key(&request) else {
        return ApiError::forbidden("Unable to determine client IP.").into_response();
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(client = %ip, "Login rate limit exceeded");
            ApiError::too_many_requests("Too many login attempts. Please wait before trying again.")
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(forwarded: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/authenticate");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_client_key_prefers_connect_info() {
        let mut request = request_from(Some("10.0.0.1"));
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 4000))));

        assert_eq!(client_key(&request).as_deref(), Some("192.168.1.5"));
    }

    #[test]
    fn test_client_key_first_forwarded_hop() {
        let request = request_from(Some(" 10.0.0.1 , 10.0.0.2"));
        assert_eq!(client_key(&request).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_client_key_missing() {
        assert_eq!(client_key(&request_from(None)), None);
        assert_eq!(client_key(&request_from(Some(""))), None);
    }

    #[test]
    fn test_burst_then_limited() {
        let config = RateLimitConfig::new(LoginQuota {
            per_second: 1,
            burst: 2,
        });
        let key = "127.0.0.1".to_string();

        assert!(config.login.check_key(&key).is_ok());
        assert!(config.login.check_key(&key).is_ok());
        assert!(config.login.check_key(&key).is_err());
        assert!(config.login.check_key(&"127.0.0.2".to_string()).is_ok());
    }

    #[test]
    fn test_prune_forgets_refilled_clients() {
        let config = RateLimitConfig::new(LoginQuota {
            per_second: 1000,
            burst: 1,
        });
        assert!(config.login.check_key(&"10.0.0.1".to_string()).is_ok());
        assert_eq!(config.login.len(), 1);

        std::thread::sleep(Duration::from_millis(20));
        config.prune();

        assert!(config.login.is_empty());
    }

    #[test]
    fn test_prune_keeps_limited_clients() {
        let config = RateLimitConfig::new(LoginQuota {
            per_second: 1,
            burst: 1,
        });
        let key = "10.0.0.1".to_string();
        assert!(config.login.check_key(&key).is_ok());

        config.prune();

        assert_eq!(config.login.len(), 1);
        assert!(config.login.check_key(&key).is_err());
    }

    #[tokio::test]
    async fn test_pruner_runs_in_background() {
        let config = RateLimitConfig::new(LoginQuota {
            per_second: 1000,
            burst: 1,
        });
        assert!(config.login.check_key(&"10.0.0.1".to_string()).is_ok());

        let handle = config.spawn_pruner(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(config.login.is_empty());
    }
}
