//! `qe-core` — shared data model and error taxonomy for the QE
//! Intelligence Platform.
//!
//! Every other workspace crate (`hub`, `mcp-client`, `evidence`,
//! `orchestrator`, `cli`, `mocks`) depends on this crate for its value
//! types rather than redefining them. Nothing in here talks to a network,
//! a filesystem, or a clock beyond `chrono::Utc::now()` callers pass in
//! explicitly — this crate is pure data plus small invariant-preserving
//! constructors.
//!
//! ```
//! use qe_core::models::ClassificationScores;
//!
//! let scores = ClassificationScores::new(0.9, 0.05, 0.05);
//! assert_eq!(scores.primary().as_str(), "product_bug");
//! ```

pub mod error;
pub mod models;

pub use error::{QeError, Result};
pub use models::*;

/// Crate version, exposed so `cli` can report it in `--version` output and
/// embed it in run metadata without duplicating the Cargo.toml value.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
