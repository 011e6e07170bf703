//! Fluent builders for constructing [`qe_core`] result types in tests,
//! grounded on the teacher's `mocks/src/builders.rs` `TaskBuilder` pattern.

use std::time::Duration;

use qe_core::{AgentIntelligencePackage, AgentResult, DataFlowBundle, DetailedAnalysis, ExecutionStatus, PhaseResult, QeIntelligencePackage};
use serde_json::Value;

/// Builder for an [`AgentResult`], defaulting to a successful run with
/// empty findings and zero execution time.
pub struct AgentResultBuilder {
    result: AgentResult,
}

impl AgentResultBuilder {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            result: AgentResult {
                agent_id: agent_id.into(),
                name: name.into(),
                status: ExecutionStatus::Success,
                findings: Value::Null,
                confidence: 0.8,
                execution_time: Duration::ZERO,
                output_file: None,
                error_message: None,
            },
        }
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.result.status = status;
        self
    }

    pub fn with_findings(mut self, findings: Value) -> Self {
        self.result.findings = findings;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.result.confidence = confidence;
        self
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.result.execution_time = execution_time;
        self
    }

    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.result.error_message = Some(error_message.into());
        self
    }

    pub fn build(self) -> AgentResult {
        self.result
    }
}

/// Builder for a [`PhaseResult`]; status is always derived from the
/// agent results it holds, same as the orchestrator does.
pub struct PhaseResultBuilder {
    phase_id: String,
    phase_name: String,
    agent_results: Vec<AgentResult>,
    execution_time: Duration,
}

impl PhaseResultBuilder {
    pub fn new(phase_id: impl Into<String>, phase_name: impl Into<String>) -> Self {
        Self {
            phase_id: phase_id.into(),
            phase_name: phase_name.into(),
            agent_results: Vec::new(),
            execution_time: Duration::ZERO,
        }
    }

    pub fn with_agent_result(mut self, result: AgentResult) -> Self {
        self.agent_results.push(result);
        self
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    pub fn build(self) -> PhaseResult {
        PhaseResult::new(self.phase_id, self.phase_name, self.agent_results, self.execution_time)
    }
}

/// Builder for an [`AgentIntelligencePackage`], defaulting to a preserved,
/// non-empty detailed content string so tests opt in to the broken case
/// explicitly rather than getting it by omission.
pub struct IntelligencePackageBuilder {
    package: AgentIntelligencePackage,
}

impl IntelligencePackageBuilder {
    pub fn new(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            package: AgentIntelligencePackage {
                agent_id: agent_id.into(),
                agent_name: agent_name.into(),
                status: ExecutionStatus::Success,
                findings_summary: Value::Null,
                detailed_analysis: DetailedAnalysis {
                    output_file: None,
                    content: "{}".to_string(),
                },
                confidence: 0.8,
                execution_time: Duration::ZERO,
            },
        }
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.package.status = status;
        self
    }

    pub fn with_detailed_content(mut self, content: impl Into<String>) -> Self {
        self.package.detailed_analysis.content = content.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.package.confidence = confidence;
        self
    }

    pub fn build(self) -> AgentIntelligencePackage {
        self.package
    }
}

/// Builder for a [`DataFlowBundle`] (Phase 2.5's Phase 3 input).
pub struct DataFlowBundleBuilder {
    packages: Vec<AgentIntelligencePackage>,
    qe_intelligence: Option<QeIntelligencePackage>,
}

impl DataFlowBundleBuilder {
    pub fn new() -> Self {
        Self {
            packages: Vec::new(),
            qe_intelligence: None,
        }
    }

    pub fn with_package(mut self, package: AgentIntelligencePackage) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_qe_intelligence(mut self, package: QeIntelligencePackage) -> Self {
        self.qe_intelligence = Some(package);
        self
    }

    pub fn build(self) -> DataFlowBundle {
        let data_preservation_verified = self.packages.iter().filter(|p| p.status == ExecutionStatus::Success).all(|p| p.has_preserved_content());
        DataFlowBundle {
            packages: self.packages,
            qe_intelligence: self.qe_intelligence,
            data_preservation_verified,
        }
    }
}

impl Default for DataFlowBundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
