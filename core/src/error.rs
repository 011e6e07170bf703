use thiserror::Error;

/// Result type alias used throughout the QE platform crates.
pub type Result<T> = std::result::Result<T, QeError>;

/// The error taxonomy shared by every crate in the platform.
///
/// Kinds, not type names: each variant corresponds to one of the error
/// kinds in the specification rather than to a specific failing call site.
/// Only [`QeError::Integrity`], [`QeError::UserInput`], and
/// [`QeError::Cancelled`] are allowed to influence orchestrator control
/// flow; every other variant is captured into an `AgentResult` and the run
/// continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QeError {
    /// Recoverable via retry or fallback (network blip, MCP server not
    /// running). Recovered locally by the MCP layer; never surfaces to the
    /// orchestrator.
    #[error("transient external error: {0}")]
    TransientExternal(String),

    /// Missing or invalid credential. Surfaces as a failed `AgentResult`
    /// with a deterministic message; the orchestrator continues.
    #[error("credential error: {0}")]
    Credential(String),

    /// External payload does not match the expected shape. Downgraded to a
    /// partial agent result with warnings.
    #[error("schema error: {0}")]
    Schema(String),

    /// Data-preservation verification failed in Phase 2.5. Fatal for the
    /// run; the run finishes with `success=false`.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Invalid CLI input. Produces exit code 1 with a stderr diagnostic; no
    /// run directory is created.
    #[error("invalid input: {0}")]
    UserInput(String),

    /// Cooperatively observed cancellation.
    #[error("run cancelled: {0}")]
    Cancelled(String),
}

impl QeError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QeError::Integrity(_) | QeError::UserInput(_) | QeError::Cancelled(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_integrity_user_input_cancelled_are_fatal() {
        assert!(QeError::Integrity("x".into()).is_fatal());
        assert!(QeError::UserInput("x".into()).is_fatal());
        assert!(QeError::Cancelled("x".into()).is_fatal());
        assert!(!QeError::TransientExternal("x".into()).is_fatal());
        assert!(!QeError::Credential("x".into()).is_fatal());
        assert!(!QeError::Schema("x".into()).is_fatal());
    }
}
