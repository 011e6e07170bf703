//! Circuit-breaker-style retry/backoff hinting for agent failures
//! (SPEC_FULL.md §4 supplemented feature), grounded on the teacher's
//! `core/src/circuit_breaker.rs`. The base specification (spec.md §4.1,
//! §7) only requires per-agent pass/fail bookkeeping — this adds a richer
//! failure taxonomy on top without changing that bookkeeping: it informs
//! *how* a caller might retry an agent, it never decides whether the
//! phase as a whole succeeded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an agent attempt failed, as distinct from *that* it failed.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentFailureKind {
    /// The agent lacks whatever it needed (e.g. no GitHub PR to analyze) — reassign, don't retry.
    CapabilityMismatch,
    /// The agent's input exceeded what it can reasonably process.
    ContextOverflow,
    /// The agent's own analysis logic hit an internal inconsistency.
    LogicError,
    /// An external dependency (MCP server, network) failed.
    Environmental,
    /// The run's inputs were invalid or contradictory.
    InvalidRequirements,
    /// The agent produced output that didn't match its own prior results.
    InconsistentOutput,
}

impl AgentFailureKind {
    fn default_threshold(self) -> u32 {
        match self {
            AgentFailureKind::CapabilityMismatch => 1,
            AgentFailureKind::ContextOverflow => 2,
            AgentFailureKind::LogicError => 3,
            AgentFailureKind::Environmental => 5,
            AgentFailureKind::InvalidRequirements => 1,
            AgentFailureKind::InconsistentOutput => 2,
        }
    }

    fn retry_suggestion(self) -> &'static str {
        match self {
            AgentFailureKind::CapabilityMismatch => "reassign to an agent with matching capabilities",
            AgentFailureKind::ContextOverflow => "reduce task scope or split into smaller sub-tasks",
            AgentFailureKind::LogicError => "review inputs and provide additional context",
            AgentFailureKind::Environmental => "check external dependencies and connectivity",
            AgentFailureKind::InvalidRequirements => "requirements need human review and clarification",
            AgentFailureKind::InconsistentOutput => "agent may need reinitialization or a different approach",
        }
    }

    fn backoff_seconds(self, attempt: u32) -> u64 {
        match self {
            AgentFailureKind::CapabilityMismatch => 0,
            AgentFailureKind::ContextOverflow => 30,
            AgentFailureKind::LogicError => 60 * attempt as u64,
            AgentFailureKind::Environmental => 2u64.pow(attempt.saturating_sub(1)) * 60,
            AgentFailureKind::InvalidRequirements => 0,
            AgentFailureKind::InconsistentOutput => 120,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AgentFailureKind::CapabilityMismatch => "capability mismatch",
            AgentFailureKind::ContextOverflow => "context overflow",
            AgentFailureKind::LogicError => "logic error",
            AgentFailureKind::Environmental => "environmental",
            AgentFailureKind::InvalidRequirements => "invalid requirements",
            AgentFailureKind::InconsistentOutput => "inconsistent output",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// The recommended next action after a recorded failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CircuitAction {
    Retry { delay_seconds: u64, suggestion: String },
    Reassign { reason: String },
    Simplify { reason: String, suggestion: String },
    Quarantine { reason: String, retry_after: DateTime<Utc> },
    HumanReview { reason: String },
}

/// Per-agent failure counter with kind-specific thresholds and backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCircuitBreaker {
    thresholds: HashMap<AgentFailureKind, u32>,
    counts: HashMap<AgentFailureKind, u32>,
    state: CircuitState,
    last_failure: Option<DateTime<Utc>>,
}

impl Default for AgentCircuitBreaker {
    fn default() -> Self {
        let kinds = [
            AgentFailureKind::CapabilityMismatch,
            AgentFailureKind::ContextOverflow,
            AgentFailureKind::LogicError,
            AgentFailureKind::Environmental,
            AgentFailureKind::InvalidRequirements,
            AgentFailureKind::InconsistentOutput,
        ];
        Self {
            thresholds: kinds.into_iter().map(|k| (k, k.default_threshold())).collect(),
            counts: HashMap::new(),
            state: CircuitState::Closed,
            last_failure: None,
        }
    }
}

impl AgentCircuitBreaker {
    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn can_attempt(&self) -> bool {
        !matches!(self.state, CircuitState::Open)
    }

    pub fn record_success(&mut self) {
        self.counts.clear();
        self.state = CircuitState::Closed;
        self.last_failure = None;
    }

    pub fn record_failure(&mut self, kind: AgentFailureKind) -> CircuitAction {
        self.last_failure = Some(Utc::now());
        let count = self.counts.entry(kind).or_insert(0);
        *count += 1;
        let attempt = *count;
        let threshold = self.thresholds.get(&kind).copied().unwrap_or(3);

        if attempt >= threshold {
            self.state = CircuitState::Open;
            match kind {
                AgentFailureKind::CapabilityMismatch => CircuitAction::Reassign {
                    reason: "agent lacks the capability this task requires".to_string(),
                },
                AgentFailureKind::ContextOverflow => CircuitAction::Simplify {
                    reason: "task exceeds what the agent can process in one pass".to_string(),
                    suggestion: "break the task into smaller, sequential sub-tasks".to_string(),
                },
                AgentFailureKind::InvalidRequirements => CircuitAction::HumanReview {
                    reason: "requirements are unclear or contradictory".to_string(),
                },
                _ => CircuitAction::Quarantine {
                    reason: format!("too many {} failures", kind.label()),
                    retry_after: Utc::now() + chrono::Duration::hours(1),
                },
            }
        } else {
            CircuitAction::Retry {
                delay_seconds: kind.backoff_seconds(attempt),
                suggestion: kind.retry_suggestion().to_string(),
            }
        }
    }

    /// Automatic reset after an hour for purely environmental failure
    /// histories; anything else requires a non-empty `authorized_by`.
    pub fn try_reset(&mut self, authorized_by: &str) -> bool {
        if self.state != CircuitState::Open {
            return true;
        }
        let transient_only = self.counts.keys().all(|k| matches!(k, AgentFailureKind::Environmental));
        let elapsed_hours = self.last_failure.map(|t| (Utc::now() - t).num_hours()).unwrap_or(i64::MAX);
        if elapsed_hours >= 1 && transient_only {
            self.state = CircuitState::HalfOpen;
            true
        } else if !authorized_by.is_empty() {
            self.state = CircuitState::HalfOpen;
            self.counts.clear();
            true
        } else {
            false
        }
    }
}
