//! `qe-mocks` — test doubles and fixtures shared by every crate's test
//! suite and by `qe-integration-tests`.
//!
//! Provides a scripted [`McpProtocol`](qe_mcp_client::McpProtocol)
//! implementation keyed by operation name, fluent builders for the core
//! result types, canned fixtures for the "ACM-22079" scenario used
//! throughout the integration suite, and assertion helpers with readable
//! failure messages.

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod protocol;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use protocol::{RecordingFallback, ScriptedProtocol};
