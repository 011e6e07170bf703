//! Phase 3 — AI Analysis (spec §4.1). Synthesizes every agent's staged
//! findings plus the QE Intelligence package into one structured
//! [`AnalysisSynthesis`] that Phase 4 turns into artifacts. No natural-
//! language templating lives here (spec Non-goals: "specifying the
//! natural-language content of generated test cases") — only the
//! structural synthesis a report writer downstream needs.

use qe_core::{AgentIntelligencePackage, DataFlowBundle, ExecutionStatus};
use qe_evidence::{ComponentExtractor, ExtractedComponent};

/// One synthesized observation backed by the agent(s) that produced it.
#[derive(Debug, Clone)]
pub struct SynthesizedFinding {
    pub source_agent: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisSynthesis {
    pub jira_id: String,
    pub findings: Vec<SynthesizedFinding>,
    pub recognized_components: Vec<ExtractedComponent>,
    pub coverage_gaps: Vec<String>,
    pub automation_insights: Vec<String>,
    pub test_patterns: Vec<String>,
    /// Mean confidence across every successful package plus QE
    /// Intelligence, the only aggregate confidence this layer computes —
    /// everything else traces back to `qe_evidence::ConfidenceCalculator`
    /// per spec §9's "no hardcoded confidences" decision.
    pub overall_confidence: f64,
    pub successful_agents: usize,
    pub total_agents: usize,
}

fn describe(package: &AgentIntelligencePackage) -> String {
    match package.status {
        ExecutionStatus::Success => format!("{} completed with confidence {:.2}", package.agent_name, package.confidence),
        ExecutionStatus::Failed => format!("{} failed and contributed no findings", package.agent_name),
        ExecutionStatus::Skipped => format!("{} was skipped", package.agent_name),
    }
}

pub fn synthesize(jira_id: &str, bundle: &DataFlowBundle) -> AnalysisSynthesis {
    let extractor = ComponentExtractor::new();

    let findings: Vec<SynthesizedFinding> = bundle
        .packages
        .iter()
        .map(|p| SynthesizedFinding {
            source_agent: p.agent_id.clone(),
            summary: describe(p),
        })
        .collect();

    let mut recognized_components = Vec::new();
    for package in &bundle.packages {
        recognized_components.extend(extractor.extract_from_error(&package.detailed_analysis.content));
    }
    recognized_components.dedup_by(|a, b| a.name == b.name);

    let successful_agents = bundle.packages.iter().filter(|p| p.status == ExecutionStatus::Success).count();
    let total_agents = bundle.packages.len();

    let mut confidence_samples: Vec<f64> = bundle.packages.iter().filter(|p| p.status == ExecutionStatus::Success).map(|p| p.confidence).collect();
    if let Some(qe) = &bundle.qe_intelligence {
        confidence_samples.push(qe.confidence);
    }
    let overall_confidence = if confidence_samples.is_empty() {
        0.1
    } else {
        confidence_samples.iter().sum::<f64>() / confidence_samples.len() as f64
    };

    let (coverage_gaps, automation_insights, test_patterns) = bundle
        .qe_intelligence
        .as_ref()
        .map(|qe| (qe.coverage_gaps.clone(), qe.automation_insights.clone(), qe.test_patterns.clone()))
        .unwrap_or_default();

    AnalysisSynthesis {
        jira_id: jira_id.to_string(),
        findings,
        recognized_components,
        coverage_gaps,
        automation_insights,
        test_patterns,
        overall_confidence,
        successful_agents,
        total_agents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_core::{DetailedAnalysis, QeIntelligencePackage};
    use std::time::Duration;

    fn package(agent_id: &str, status: ExecutionStatus, confidence: f64, content: &str) -> AgentIntelligencePackage {
        AgentIntelligencePackage {
            agent_id: agent_id.to_string(),
            agent_name: agent_id.to_string(),
            status,
            findings_summary: serde_json::Value::Null,
            detailed_analysis: DetailedAnalysis {
                output_file: None,
                content: content.to_string(),
            },
            confidence,
            execution_time: Duration::ZERO,
        }
    }

    #[test]
    fn overall_confidence_averages_successful_agents_and_qe() {
        let bundle = DataFlowBundle {
            packages: vec![package("agent_a_jira_intelligence", ExecutionStatus::Success, 0.8, ""), package("agent_b_documentation", ExecutionStatus::Failed, 0.0, "")],
            qe_intelligence: Some(QeIntelligencePackage {
                service_name: "qe_intelligence".into(),
                status: ExecutionStatus::Success,
                test_patterns: vec![],
                coverage_gaps: vec![],
                automation_insights: vec![],
                confidence: 0.6,
            }),
            data_preservation_verified: true,
        };
        let synthesis = synthesize("ACM-1", &bundle);
        assert!((synthesis.overall_confidence - 0.7).abs() < 1e-9);
        assert_eq!(synthesis.successful_agents, 1);
        assert_eq!(synthesis.total_agents, 2);
    }

    #[test]
    fn no_successful_agents_yields_floor_confidence() {
        let bundle = DataFlowBundle {
            packages: vec![package("agent_a_jira_intelligence", ExecutionStatus::Failed, 0.0, "")],
            qe_intelligence: None,
            data_preservation_verified: false,
        };
        let synthesis = synthesize("ACM-1", &bundle);
        assert_eq!(synthesis.overall_confidence, 0.1);
    }

    #[test]
    fn recognizes_known_components_from_detailed_content() {
        let bundle = DataFlowBundle {
            packages: vec![package("agent_b_documentation", ExecutionStatus::Success, 0.6, "error originated in search-api during indexing")],
            qe_intelligence: None,
            data_preservation_verified: true,
        };
        let synthesis = synthesize("ACM-1", &bundle);
        assert!(synthesis.recognized_components.iter().any(|c| c.name == "search-api"));
    }
}
