//! The uniform MCP facade: health check → cache lookup → protocol call →
//! fallback → metrics, the same shape for every operation regardless of
//! which external service it targets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use qe_core::{CacheEntry, McpResult, ResultSource, ServerConfig, ServerStatus};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::McpSettings;
use crate::protocol::{FallbackProvider, McpProtocol};

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub mcp_calls: u64,
    pub mcp_successes: u64,
    pub mcp_success_rate: f64,
    pub fallback_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_latency: Duration,
}

#[derive(Default)]
struct MetricsState {
    mcp_calls: u64,
    mcp_successes: u64,
    fallback_calls: u64,
    cache_hits: u64,
    cache_misses: u64,
    total_latency: Duration,
    latency_samples: u64,
}

impl MetricsState {
    fn snapshot(&self) -> MetricsSnapshot {
        let success_rate = if self.mcp_calls == 0 { 0.0 } else { self.mcp_successes as f64 / self.mcp_calls as f64 };
        let avg_latency = if self.latency_samples == 0 {
            Duration::ZERO
        } else {
            self.total_latency / self.latency_samples as u32
        };
        MetricsSnapshot {
            mcp_calls: self.mcp_calls,
            mcp_successes: self.mcp_successes,
            mcp_success_rate: success_rate,
            fallback_calls: self.fallback_calls,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            avg_latency,
        }
    }
}

/// Deterministic cache key: sha256 of the operation name plus a
/// key-sorted, recursively canonicalized serialization of the arguments.
/// Never includes server credentials — callers pass only the logical
/// operation arguments, not auth material, into `args`.
pub fn cache_key(operation: &str, args: &Value) -> String {
    let canonical = canonicalize(args);
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys.iter().map(|k| format!("{:?}:{}", k, canonicalize(&map[*k]))).collect();
            format!("{{{}}}", entries.join(","))
        }
        Value::Array(items) => {
            let entries: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", entries.join(","))
        }
        other => other.to_string(),
    }
}

pub struct McpClient {
    servers: HashMap<String, ServerConfig>,
    settings: McpSettings,
    cache: Mutex<HashMap<String, CacheEntry>>,
    health: Mutex<HashMap<String, (ServerStatus, chrono::DateTime<Utc>)>>,
    metrics: Mutex<MetricsState>,
    protocol: Arc<dyn McpProtocol>,
    fallback: Arc<dyn FallbackProvider>,
}

impl McpClient {
    pub fn new(servers: HashMap<String, ServerConfig>, settings: McpSettings, protocol: Arc<dyn McpProtocol>, fallback: Arc<dyn FallbackProvider>) -> Self {
        Self {
            servers,
            settings,
            cache: Mutex::new(HashMap::new()),
            health: Mutex::new(HashMap::new()),
            metrics: Mutex::new(MetricsState::default()),
            protocol,
            fallback,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    pub fn has_server(&self, server_id: &str) -> bool {
        self.servers.contains_key(server_id)
    }

    /// Current server status, re-checking with the protocol layer only if
    /// the last check is older than `health_check_interval` seconds.
    async fn status_for(&self, server_id: &str) -> ServerStatus {
        let interval = chrono::Duration::seconds(self.settings.health_check_interval as i64);
        let stale = {
            let health = self.health.lock();
            match health.get(server_id) {
                Some((_, checked_at)) => Utc::now().signed_duration_since(*checked_at) >= interval,
                None => true,
            }
        };

        if !stale {
            return self.health.lock().get(server_id).map(|(s, _)| *s).unwrap_or(ServerStatus::Unknown);
        }

        let status = self.protocol.health_check(server_id).await;
        self.health.lock().insert(server_id.to_string(), (status, Utc::now()));
        status
    }

    /// Run the uniform operation algorithm described in the platform's
    /// MCP integration design: cache → health → protocol → fallback →
    /// metrics.
    pub async fn execute(&self, server_id: &str, operation: &str, args: Value) -> McpResult {
        let key = cache_key(operation, &args);

        if self.settings.enable_cache {
            let mut cache = self.cache.lock();
            if let Some(entry) = cache.get(&key) {
                if !entry.is_expired(Utc::now()) {
                    self.metrics.lock().cache_hits += 1;
                    return McpResult {
                        success: true,
                        data: entry.value.clone(),
                        source: ResultSource::Cache,
                        error_message: None,
                        fallback_reason: None,
                    };
                }
                cache.remove(&key);
            }
            self.metrics.lock().cache_misses += 1;
        }

        let status = self.status_for(server_id).await;
        let started = Instant::now();

        if status != ServerStatus::Unavailable {
            self.metrics.lock().mcp_calls += 1;
            match self.protocol.call(server_id, operation, &args).await {
                Ok(data) => {
                    let elapsed = started.elapsed();
                    {
                        let mut metrics = self.metrics.lock();
                        metrics.mcp_successes += 1;
                        metrics.total_latency += elapsed;
                        metrics.latency_samples += 1;
                    }
                    if self.settings.enable_cache {
                        self.cache.lock().insert(
                            key,
                            CacheEntry {
                                key: operation.to_string(),
                                value: data.clone(),
                                inserted_at: Utc::now(),
                                ttl: Duration::from_secs(self.settings.cache_ttl),
                            },
                        );
                    }
                    info!(server_id, operation, "mcp call succeeded");
                    return McpResult {
                        success: true,
                        data,
                        source: ResultSource::Mcp,
                        error_message: None,
                        fallback_reason: None,
                    };
                }
                Err(e) => {
                    warn!(server_id, operation, error = %e, "mcp call failed, attempting fallback");
                    return self.try_fallback(operation, &args, Some(e.to_string())).await;
                }
            }
        }

        self.try_fallback(operation, &args, Some(format!("server {server_id} is unavailable"))).await
    }

    async fn try_fallback(&self, operation: &str, args: &Value, reason: Option<String>) -> McpResult {
        if !self.settings.enable_fallback {
            return McpResult {
                success: false,
                data: Value::Null,
                source: ResultSource::Mcp,
                error_message: reason,
                fallback_reason: None,
            };
        }

        self.metrics.lock().fallback_calls += 1;
        match self.fallback.fallback(operation, args).await {
            Some(data) => McpResult {
                success: true,
                data,
                source: ResultSource::Fallback,
                error_message: None,
                fallback_reason: reason,
            },
            None => McpResult {
                success: false,
                data: Value::Null,
                source: ResultSource::Fallback,
                error_message: reason,
                fallback_reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qe_core::{QeError, Result};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct ScriptedProtocol {
        status: ServerStatus,
        call_count: AtomicU64,
        succeed: bool,
    }

    #[async_trait]
    impl McpProtocol for ScriptedProtocol {
        async fn call(&self, _server_id: &str, _operation: &str, _args: &Value) -> Result<Value> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(serde_json::json!({ "ok": true }))
            } else {
                Err(QeError::TransientExternal("simulated network failure".into()))
            }
        }

        async fn health_check(&self, _server_id: &str) -> ServerStatus {
            self.status
        }
    }

    struct AlwaysFallback;

    #[async_trait]
    impl FallbackProvider for AlwaysFallback {
        async fn fallback(&self, _operation: &str, _args: &Value) -> Option<Value> {
            Some(serde_json::json!({ "fallback": true }))
        }
    }

    fn settings() -> McpSettings {
        McpSettings {
            cache_ttl: 300,
            health_check_interval: 60,
            enable_fallback: true,
            enable_cache: true,
            max_retries: 3,
            retry_delay: 1.0,
        }
    }

    #[tokio::test]
    async fn successful_call_is_cached_and_reused() {
        let protocol = Arc::new(ScriptedProtocol {
            status: ServerStatus::Available,
            call_count: AtomicU64::new(0),
            succeed: true,
        });
        let client = McpClient::new(HashMap::new(), settings(), protocol.clone(), Arc::new(crate::protocol::NoFallback));

        let first = client.execute("jenkins", "jenkins_get_build", serde_json::json!({"build": 1})).await;
        assert!(first.success);
        assert_eq!(first.source, ResultSource::Mcp);

        let second = client.execute("jenkins", "jenkins_get_build", serde_json::json!({"build": 1})).await;
        assert!(second.success);
        assert_eq!(second.source, ResultSource::Cache);

        assert_eq!(protocol.call_count.load(Ordering::SeqCst), 1);
        let metrics = client.metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.mcp_calls, 1);
    }

    #[tokio::test]
    async fn failed_call_falls_back_and_reports_reason() {
        let protocol = Arc::new(ScriptedProtocol {
            status: ServerStatus::Available,
            call_count: AtomicU64::new(0),
            succeed: false,
        });
        let client = McpClient::new(HashMap::new(), settings(), protocol, Arc::new(AlwaysFallback));

        let result = client.execute("jenkins", "jenkins_get_console", serde_json::json!({})).await;
        assert!(result.success);
        assert_eq!(result.source, ResultSource::Fallback);
        assert!(result.fallback_reason.is_some());

        let metrics = client.metrics();
        assert_eq!(metrics.fallback_calls, 1);
        assert_eq!(metrics.mcp_successes, 0);
    }

    #[tokio::test]
    async fn unavailable_server_skips_protocol_call_entirely() {
        let protocol = Arc::new(ScriptedProtocol {
            status: ServerStatus::Unavailable,
            call_count: AtomicU64::new(0),
            succeed: true,
        });
        let client = McpClient::new(HashMap::new(), settings(), protocol.clone(), Arc::new(AlwaysFallback));

        let result = client.execute("jenkins", "jenkins_get_build", serde_json::json!({})).await;
        assert_eq!(result.source, ResultSource::Fallback);
        assert_eq!(protocol.call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cache_key_is_stable_under_key_reordering() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(cache_key("op", &a), cache_key("op", &b));
    }

    #[test]
    fn cache_key_differs_for_different_operations() {
        let args = serde_json::json!({"a": 1});
        assert_ne!(cache_key("op_a", &args), cache_key("op_b", &args));
    }
}
