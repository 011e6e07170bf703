//! The transport-agnostic protocol seam: anything that can answer an MCP
//! operation call and report its own health implements [`McpProtocol`].
//! Production wiring plugs in a stdio-subprocess or HTTP implementation;
//! tests plug in a scripted one.

use async_trait::async_trait;
use qe_core::{Result, ServerStatus};
use serde_json::Value;

#[async_trait]
pub trait McpProtocol: Send + Sync {
    /// Execute one operation against a server. Implementations must honor
    /// the operation's configured timeout themselves and return
    /// `Err(QeError::TransientExternal(..))` on timeout rather than hanging
    /// the caller.
    async fn call(&self, server_id: &str, operation: &str, args: &Value) -> Result<Value>;

    /// Check whether the given server is currently reachable. Called no
    /// more often than the configured health-check interval — the facade
    /// in [`crate::client`] is responsible for that throttling, not this
    /// trait.
    async fn health_check(&self, server_id: &str) -> ServerStatus;
}

/// Something that can answer an operation when the protocol path is
/// unavailable or failed: a direct CLI call, a local cache read, etc.
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    /// Attempt the operation via a non-protocol path. Returns `None` if
    /// this provider has no fallback for the given operation, or if the
    /// fallback itself failed — both cases are treated identically by the
    /// facade (try the next thing, or give up).
    async fn fallback(&self, operation: &str, args: &Value) -> Option<Value>;
}

/// A [`FallbackProvider`] with nothing configured — every fallback attempt
/// misses. Useful as a default when a deployment has `enable_fallback =
/// false` or simply has no CLI fallbacks wired up.
pub struct NoFallback;

#[async_trait]
impl FallbackProvider for NoFallback {
    async fn fallback(&self, _operation: &str, _args: &Value) -> Option<Value> {
        None
    }
}
