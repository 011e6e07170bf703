//! Shared data model for the QE intelligence platform.
//!
//! Every type here is a plain, serializable value — no behavior beyond
//! small invariant-preserving constructors and accessors. Crates that
//! produce or consume these types (`hub`, `mcp-client`, `evidence`,
//! `orchestrator`) depend on `qe-core` rather than redefining them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ---------------------------------------------------------------------
// Communication Hub types (spec §3 "Message", §4.2)
// ---------------------------------------------------------------------

/// Delivery priority carried on a [`Message`] envelope.
///
/// Priority is recorded but does not reorder the hub's delivery queue — see
/// [`crate::error`] module docs and DESIGN.md for the rationale. FIFO per
/// publish order is the normative guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// The recipient of a [`Message`]: either a specific agent or every
/// subscriber currently registered for the message type (broadcast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Agent(String),
    Broadcast,
}

impl Target {
    pub fn matches(&self, agent_id: &str) -> bool {
        match self {
            Target::Agent(id) => id == agent_id,
            Target::Broadcast => true,
        }
    }
}

/// A single pub/sub envelope exchanged through the [`hub`](../hub/index.html)
/// crate's communication hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub target: Target,
    pub message_type: String,
    pub payload: serde_json::Value,
    /// Monotonic sequence number assigned by the hub at publish time, used
    /// to establish FIFO ordering independent of wall-clock resolution.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
    pub requires_response: bool,
    pub correlation_id: Option<String>,
}

// ---------------------------------------------------------------------
// Agent / Phase result types (spec §3, §4.1)
// ---------------------------------------------------------------------

/// Terminal status of a single agent's execution within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

/// Outcome of one agent's run within a phase.
///
/// Agents never throw across the phase boundary (§7): every failure is
/// captured here with `status = Failed`, `confidence = 0.0`, and empty
/// findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: String,
    pub name: String,
    pub status: ExecutionStatus,
    pub findings: serde_json::Value,
    pub confidence: f64,
    pub execution_time: Duration,
    pub output_file: Option<String>,
    pub error_message: Option<String>,
}

impl AgentResult {
    pub fn failed(agent_id: impl Into<String>, name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            status: ExecutionStatus::Failed,
            findings: serde_json::Value::Null,
            confidence: 0.0,
            execution_time: Duration::ZERO,
            output_file: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Aggregate execution status of a whole phase, derived from its
/// constituent [`AgentResult`]s (spec §4.1 Failure semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Success,
    Partial,
    Failed,
}

impl PhaseStatus {
    /// Derive phase status from agent outcomes: `Success` if every agent
    /// succeeded, `Partial` if at least one succeeded, `Failed` only when
    /// every agent in the phase failed. An empty agent list (a phase with
    /// no agents, e.g. a synchronous cleanup step) is `Success`.
    pub fn from_agent_results(results: &[AgentResult]) -> Self {
        if results.is_empty() {
            return PhaseStatus::Success;
        }
        let succeeded = results.iter().filter(|r| r.status == ExecutionStatus::Success).count();
        if succeeded == results.len() {
            PhaseStatus::Success
        } else if succeeded > 0 {
            PhaseStatus::Partial
        } else {
            PhaseStatus::Failed
        }
    }
}

/// Result of running one phase of the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase_name: String,
    pub phase_id: String,
    pub status: PhaseStatus,
    pub agent_results: Vec<AgentResult>,
    pub execution_time: Duration,
    pub error_message: Option<String>,
}

impl PhaseResult {
    pub fn new(phase_id: impl Into<String>, phase_name: impl Into<String>, agent_results: Vec<AgentResult>, execution_time: Duration) -> Self {
        let status = PhaseStatus::from_agent_results(&agent_results);
        Self {
            phase_name: phase_name.into(),
            phase_id: phase_id.into(),
            status,
            agent_results,
            execution_time,
            error_message: None,
        }
    }
}

// ---------------------------------------------------------------------
// Phase 2.5 staging types
// ---------------------------------------------------------------------

/// The detailed analysis content an agent emitted, preserved verbatim from
/// agent output through to Phase 3 input (spec §3, §4.7 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub output_file: Option<String>,
    pub content: String,
}

/// Phase 2.5 wraps every Phase 1 / Phase 2 [`AgentResult`] in one of these
/// before handing the bundle to Phase 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIntelligencePackage {
    pub agent_id: String,
    pub agent_name: String,
    pub status: ExecutionStatus,
    pub findings_summary: serde_json::Value,
    pub detailed_analysis: DetailedAnalysis,
    pub confidence: f64,
    pub execution_time: Duration,
}

impl AgentIntelligencePackage {
    /// True when this package's detailed content is non-empty — the
    /// per-package half of the `data_preservation_verified` invariant.
    pub fn has_preserved_content(&self) -> bool {
        !self.detailed_analysis.content.trim().is_empty()
    }
}

/// Output of the QE Intelligence service, folded into Phase 2.5's bundle
/// alongside the staged agent packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QeIntelligencePackage {
    pub service_name: String,
    pub status: ExecutionStatus,
    pub test_patterns: Vec<String>,
    pub coverage_gaps: Vec<String>,
    pub automation_insights: Vec<String>,
    pub confidence: f64,
}

/// The single bundle Phase 2.5 hands to Phase 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowBundle {
    pub packages: Vec<AgentIntelligencePackage>,
    pub qe_intelligence: Option<QeIntelligencePackage>,
    /// Set `true` only when every package whose source agent succeeded has
    /// non-empty detailed content (the normative rule from spec §9, not the
    /// optimistic legacy behavior).
    pub data_preservation_verified: bool,
}

// ---------------------------------------------------------------------
// Classification / confidence types (spec §4.4)
// ---------------------------------------------------------------------

/// The three-way verdict produced by the decision matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    ProductBug,
    AutomationBug,
    Infrastructure,
}

impl Classification {
    /// Stable lowercase wire representation (DESIGN NOTES §9: map enums to
    /// stable strings rather than relying on reflection).
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::ProductBug => "product_bug",
            Classification::AutomationBug => "automation_bug",
            Classification::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Three-way classification scores. Always sums to 1.0 within 1e-3 — the
/// constructor normalizes whatever is passed in, so this invariant holds
/// for every instance in existence, not just ones built through the
/// decision matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScores {
    pub product_bug: f64,
    pub automation_bug: f64,
    pub infrastructure: f64,
}

impl ClassificationScores {
    /// Build normalized scores from raw (possibly non-normalized) triples.
    pub fn new(product_bug: f64, automation_bug: f64, infrastructure: f64) -> Self {
        let total = product_bug + automation_bug + infrastructure;
        if total <= 0.0 {
            return Self {
                product_bug: 1.0 / 3.0,
                automation_bug: 1.0 / 3.0,
                infrastructure: 1.0 / 3.0,
            };
        }
        Self {
            product_bug: product_bug / total,
            automation_bug: automation_bug / total,
            infrastructure: infrastructure / total,
        }
    }

    /// The winning classification. Ties are broken in a fixed order
    /// (product, automation, infrastructure) so the result is deterministic.
    pub fn primary(&self) -> Classification {
        let candidates = [
            (Classification::ProductBug, self.product_bug),
            (Classification::AutomationBug, self.automation_bug),
            (Classification::Infrastructure, self.infrastructure),
        ];
        candidates
            .into_iter()
            .fold(None, |best: Option<(Classification, f64)>, (c, s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((c, s)),
            })
            .expect("three candidates are always present")
            .0
    }

    /// `(max - second_max) / max`, the margin between the winner and the
    /// runner-up, normalized by the winner's score. `0.0` when the winner's
    /// score is `0.0`.
    pub fn separation(&self) -> f64 {
        let mut sorted = [self.product_bug, self.automation_bug, self.infrastructure];
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        if sorted[0] <= 0.0 {
            0.0
        } else {
            (sorted[0] - sorted[1]) / sorted[0]
        }
    }

    pub fn get(&self, classification: Classification) -> f64 {
        match classification {
            Classification::ProductBug => self.product_bug,
            Classification::AutomationBug => self.automation_bug,
            Classification::Infrastructure => self.infrastructure,
        }
    }
}

/// Qualitative confidence band derived from [`ConfidenceBreakdown::final_confidence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// The weighted confidence factors and the resulting calibrated score.
///
/// `final_confidence` is always clamped to `[0.1, 0.95]` — the
/// specification never allows a classification to claim perfect certainty
/// or near-zero certainty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub score_separation: f64,
    pub evidence_completeness: f64,
    pub source_consistency: f64,
    pub selector_certainty: f64,
    pub history_signal: f64,
    pub final_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub warnings: Vec<String>,
}

impl ConfidenceBreakdown {
    pub const MIN_CONFIDENCE: f64 = 0.1;
    pub const MAX_CONFIDENCE: f64 = 0.95;

    pub fn clamp_confidence(value: f64) -> f64 {
        value.clamp(Self::MIN_CONFIDENCE, Self::MAX_CONFIDENCE)
    }
}

// ---------------------------------------------------------------------
// Evidence package types (spec §3, §4.5)
// ---------------------------------------------------------------------

/// A test failure's categorized shape (spec §4.5 categorization rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    ServerError,
    ElementNotFound,
    Timeout,
    Network,
    Assertion,
    AuthError,
    Unknown,
}

impl FailureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::ServerError => "server_error",
            FailureType::ElementNotFound => "element_not_found",
            FailureType::Timeout => "timeout",
            FailureType::Network => "network",
            FailureType::Assertion => "assertion",
            FailureType::AuthError => "auth_error",
            FailureType::Unknown => "unknown",
        }
    }

    /// Parse a failure-type label case-insensitively, normalizing spaces to
    /// underscores (`"element not found"` → `ElementNotFound`), falling
    /// back to `Unknown` for anything unrecognized.
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "server_error" => FailureType::ServerError,
            "element_not_found" => FailureType::ElementNotFound,
            "timeout" => FailureType::Timeout,
            "network" => FailureType::Network,
            "assertion" => FailureType::Assertion,
            "auth_error" => FailureType::AuthError,
            _ => FailureType::Unknown,
        }
    }
}

pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Truncate an error message to [`MAX_ERROR_MESSAGE_LEN`] characters,
/// respecting UTF-8 character boundaries.
pub fn truncate_error_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        message.to_string()
    } else {
        message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCauseLocation {
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFailureEvidence {
    pub test_name: String,
    pub error_message: String,
    pub failure_category: FailureType,
    pub root_cause: Option<RootCauseLocation>,
}

impl TestFailureEvidence {
    pub fn new(test_name: impl Into<String>, error_message: impl Into<String>, failure_category: FailureType, root_cause: Option<RootCauseLocation>) -> Self {
        Self {
            test_name: test_name.into(),
            error_message: truncate_error_message(&error_message.into()),
            failure_category,
            root_cause,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorLookup {
    pub found: bool,
    pub recently_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEvidence {
    pub clone_succeeded: bool,
    pub branch: String,
    pub selector_lookup: Option<SelectorLookup>,
    /// Age of the most recent relevant commit, if git history was
    /// consulted.
    pub git_history_age: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentEvidence {
    pub healthy: bool,
    pub accessible: bool,
    pub api_accessible: bool,
    pub target_cluster: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleEvidence {
    pub has_500_errors: bool,
    pub has_network_errors: bool,
    pub has_api_errors: bool,
    pub has_connection_refused: bool,
    pub key_error_snippets: Vec<String>,
}

/// All the evidence gathered and pre-classified for one failing test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFailurePackage {
    pub test: TestFailureEvidence,
    pub repository: Option<RepositoryEvidence>,
    pub environment: Option<EnvironmentEvidence>,
    pub console: Option<ConsoleEvidence>,
    pub scores: ClassificationScores,
    pub confidence: ConfidenceBreakdown,
}

/// The aggregated result for a whole Jenkins build: one [`TestFailurePackage`]
/// per failing test plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedEvidencePackage {
    pub jenkins_url: String,
    pub build_number: String,
    pub per_test: Vec<TestFailurePackage>,
    pub total_failures: usize,
    pub classification_counts: HashMap<String, usize>,
}

impl AggregatedEvidencePackage {
    pub fn new(jenkins_url: impl Into<String>, build_number: impl Into<String>, per_test: Vec<TestFailurePackage>) -> Self {
        let mut classification_counts: HashMap<String, usize> = HashMap::new();
        for pkg in &per_test {
            *classification_counts.entry(pkg.scores.primary().as_str().to_string()).or_insert(0) += 1;
        }
        Self {
            jenkins_url: jenkins_url.into(),
            build_number: build_number.into(),
            total_failures: per_test.len(),
            per_test,
            classification_counts,
        }
    }
}

// ---------------------------------------------------------------------
// MCP layer types (spec §3, §4.3)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server_id: String,
    pub transport: TransportKind,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub url: Option<String>,
    pub credential_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Available,
    Degraded,
    Unavailable,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.inserted_at);
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age >= ttl,
            Err(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Mcp,
    Fallback,
    Cache,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResult {
    pub success: bool,
    pub data: serde_json::Value,
    pub source: ResultSource,
    pub error_message: Option<String>,
    pub fallback_reason: Option<String>,
}

// ---------------------------------------------------------------------
// Workflow-level result
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Done,
    Cancelled,
    FatalAbort,
}

/// Top-level result of `ExecuteFullWorkflow` (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub outcome: RunOutcome,
    pub phases: Vec<PhaseResult>,
    pub run_directory: String,
    pub error_message: Option<String>,
}
