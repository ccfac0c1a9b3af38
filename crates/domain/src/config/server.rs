use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `[server]`: HTTP listener, auth and turn-stream transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Env var holding the bearer token. Unset or empty leaves the
    /// conversation routes open.
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
    /// Requests served at once before new ones queue.
    /// `LC_MAX_CONCURRENT_REQUESTS` overrides it.
    #[serde(default = "d_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Comment frames sent on an idle turn stream so proxies keep it open.
    #[serde(default = "d_sse_keep_alive_secs")]
    pub sse_keep_alive_secs: u64,
    /// How often locks of conversations with no running turn are dropped.
    #[serde(default = "d_lock_prune_interval_secs")]
    pub lock_prune_interval_secs: u64,
    /// Per-IP limiting; absent means unlimited.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs.max(1))
    }

    pub fn lock_prune_interval(&self) -> Duration {
        Duration::from_secs(self.lock_prune_interval_secs.max(1))
    }

    /// Configured limit, unless a positive `LC_MAX_CONCURRENT_REQUESTS`
    /// says otherwise.
    pub fn effective_concurrency(&self, env_override: Option<&str>) -> usize {
        env_override
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.max_concurrent_requests)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            cors: CorsConfig::default(),
            api_token_env: d_api_token_env(),
            max_concurrent_requests: d_max_concurrent_requests(),
            sse_keep_alive_secs: d_sse_keep_alive_secs(),
            lock_prune_interval_secs: d_lock_prune_interval_secs(),
            rate_limit: None,
        }
    }
}

/// Token bucket per client IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins, `scheme://host:*` for any port, or a lone `"*"`.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*"
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    3210
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_api_token_env() -> String {
    "LC_API_TOKEN".into()
}
fn d_max_concurrent_requests() -> usize {
    256
}
fn d_sse_keep_alive_secs() -> u64 {
    15
}
fn d_lock_prune_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_engine_defaults() {
        let cfg: ServerConfig = toml::from_str("port = 8080").unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.sse_keep_alive(), Duration::from_secs(15));
        assert_eq!(cfg.lock_prune_interval(), Duration::from_secs(60));
        assert_eq!(cfg.max_concurrent_requests, 256);
        assert!(cfg.rate_limit.is_none());
    }

    #[test]
    fn rate_limit_table_is_parsed() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            [rate_limit]
            requests_per_second = 5
            burst_size = 20
        "#,
        )
        .unwrap();
        assert_eq!(
            cfg.rate_limit,
            Some(RateLimitConfig { requests_per_second: 5, burst_size: 20 })
        );
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let cfg: ServerConfig =
            toml::from_str("sse_keep_alive_secs = 0\nlock_prune_interval_secs = 0").unwrap();
        assert_eq!(cfg.sse_keep_alive(), Duration::from_secs(1));
        assert_eq!(cfg.lock_prune_interval(), Duration::from_secs(1));
    }

    #[test]
    fn concurrency_env_override() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.effective_concurrency(None), 256);
        assert_eq!(cfg.effective_concurrency(Some(" 32 ")), 32);
        assert_eq!(cfg.effective_concurrency(Some("0")), 256);
        assert_eq!(cfg.effective_concurrency(Some("lots")), 256);
    }

    #[test]
    fn wildcard_cors_is_detected() {
        let mut cors = CorsConfig::default();
        assert!(!cors.allows_any());
        cors.allowed_origins = vec!["*".into()];
        assert!(cors.allows_any());
    }
}
