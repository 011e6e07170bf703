//! A scripted [`McpProtocol`] keyed by operation name, plus a fallback
//! provider that just records what it was asked for. Grounded on the
//! teacher's `mocks/src/repository.rs` `MockTaskRepository` pattern — a
//! `parking_lot::Mutex`-guarded state struct standing in for the real
//! trait implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use qe_core::{QeError, Result, ServerStatus};
use qe_mcp_client::{FallbackProvider, McpProtocol};
use serde_json::Value;

/// Responds to `execute(server_id, operation, args)` with whatever was
/// scripted for that operation name, independent of `server_id`/`args`.
/// Operations with no script return `QeError::TransientExternal` so a test
/// exercising the fallback path doesn't need a separate protocol type.
pub struct ScriptedProtocol {
    responses: Mutex<HashMap<String, Value>>,
    status: ServerStatus,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedProtocol {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            status: ServerStatus::Available,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_status(status: ServerStatus) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            status,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, operation: impl Into<String>, response: Value) -> Self {
        self.responses.lock().insert(operation.into(), response);
        self
    }

    /// Every `(server_id, operation)` pair this protocol has been asked to
    /// call, in order, for assertions about what an agent actually did.
    pub fn recorded_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

impl Default for ScriptedProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpProtocol for ScriptedProtocol {
    async fn call(&self, server_id: &str, operation: &str, _args: &Value) -> Result<Value> {
        self.calls.lock().push((server_id.to_string(), operation.to_string()));
        match self.responses.lock().get(operation) {
            Some(response) => Ok(response.clone()),
            None => Err(QeError::TransientExternal(format!("no scripted response for operation '{operation}'"))),
        }
    }

    async fn health_check(&self, _server_id: &str) -> ServerStatus {
        self.status
    }
}

/// A fallback provider that records every call it receives and never
/// actually produces data — useful for asserting an agent fell back
/// without caring what the fallback returned.
#[derive(Default)]
pub struct RecordingFallback {
    calls: Mutex<Vec<String>>,
}

impl RecordingFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded_operations(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FallbackProvider for RecordingFallback {
    async fn fallback(&self, operation: &str, _args: &Value) -> Option<Value> {
        self.calls.lock().push(operation.to_string());
        None
    }
}
