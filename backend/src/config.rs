use std::time::Duration;

use common::search_const::FACET_VALUE_LIMIT;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalBackendConfig {
    /// Values kept per facet, biggest counts first.
    pub facet_value_limit: usize,
    /// Artificial delay before each answer, to behave like a remote service.
    pub latency: Option<Duration>,
}

impl Default for LocalBackendConfig {
    fn default() -> Self {
        Self { facet_value_limit: FACET_VALUE_LIMIT, latency: None }
    }
}

impl LocalBackendConfig {
    /// Defaults, overridden by `LOCAL_BACKEND_FACET_LIMIT` and `LOCAL_BACKEND_LATENCY_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(limit) = std::env::var("LOCAL_BACKEND_FACET_LIMIT").ok().and_then(|v| v.parse().ok()) {
            config.facet_value_limit = limit;
        }
        if let Some(ms) = std::env::var("LOCAL_BACKEND_LATENCY_MS").ok().and_then(|v| v.parse().ok()) {
            config.latency = Some(Duration::from_millis(ms));
        }
        config
    }
}
