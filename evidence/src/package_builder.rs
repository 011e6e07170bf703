//! Combines per-test failure features, repository analysis, environment
//! state, and console errors into a single structured evidence package,
//! pre-applying the decision matrix, confidence calculation, and
//! cross-reference validation (spec §4.5).

use std::time::Duration;

use qe_core::{
    AggregatedEvidencePackage, Classification, ClassificationScores, ConfidenceBreakdown, ConfidenceLevel, ConsoleEvidence, EnvironmentEvidence,
    FailureType, RepositoryEvidence, RootCauseLocation, SelectorLookup, TestFailureEvidence, TestFailurePackage,
};

use crate::confidence::{ConfidenceCalculator, EvidenceCompleteness, HistorySignal, SelectorCertainty, SourceConsistency};
use crate::cross_validation::{CrossReferenceValidator, ValidationContext};
use crate::decision_matrix::{AdjustmentFactors, ClassificationDecisionMatrix};

/// Input describing one failing test before evidence has been assembled.
#[derive(Debug, Clone)]
pub struct FailedTestInput {
    pub test_name: String,
    pub error_message: String,
    pub stack_trace: String,
}

#[derive(Debug, Clone)]
pub struct EnvironmentInput {
    pub healthy: bool,
    pub accessible: bool,
    pub api_accessible: bool,
    pub target_cluster: Option<String>,
}

impl Default for EnvironmentInput {
    /// Absent environment data defaults to healthy/accessible, matching the
    /// builder's "assume the happy path absent evidence to the contrary"
    /// behavior for this one input.
    fn default() -> Self {
        Self {
            healthy: true,
            accessible: true,
            api_accessible: true,
            target_cluster: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RepositoryInput {
    /// Defaults to `false`: absent repository data means cloning was never
    /// attempted, not that it silently succeeded.
    pub clone_succeeded: bool,
    pub branch: Option<String>,
    pub selector_found: Option<bool>,
    pub selector_recently_changed: Option<bool>,
    pub git_history_age: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleInput {
    pub key_errors: Vec<String>,
}

impl ConsoleInput {
    fn to_evidence(&self) -> ConsoleEvidence {
        let joined = self.key_errors.join(" ").to_lowercase();
        ConsoleEvidence {
            has_500_errors: joined.contains("500") || joined.contains("internal server error"),
            has_network_errors: joined.contains("network") || joined.contains("econnrefused"),
            has_api_errors: joined.contains("api"),
            has_connection_refused: joined.contains("connection refused") || joined.contains("econnrefused"),
            key_error_snippets: self.key_errors.clone(),
        }
    }
}

/// Categorizes a raw error message into one of the normative failure types
/// (spec §4.5). Pure and deterministic: the same message always yields the
/// same category.
pub fn categorize_failure(error_message: &str) -> FailureType {
    let lower = error_message.to_lowercase();
    if lower.is_empty() {
        return FailureType::Unknown;
    }
    if lower.contains("500") || lower.contains("internal server error") {
        return FailureType::ServerError;
    }
    if lower.contains("not found") || lower.contains("could not find") || lower.contains("expected to find element") {
        return FailureType::ElementNotFound;
    }
    if lower.contains("timeout") || lower.contains("timed out") {
        return FailureType::Timeout;
    }
    if lower.contains("401") || lower.contains("403") || lower.contains("unauthorized") || lower.contains("forbidden") {
        return FailureType::AuthError;
    }
    if lower.contains("connection refused") || lower.contains("econnrefused") || lower.contains("network") {
        return FailureType::Network;
    }
    if (lower.contains("expected") && lower.contains("to equal")) || lower.contains("assertionerror") {
        return FailureType::Assertion;
    }
    FailureType::Unknown
}

/// Nudges a score triple so the named classification becomes the primary
/// one, used when the cross-reference validator corrects a classification.
fn boost_toward(scores: ClassificationScores, target: Classification) -> ClassificationScores {
    if scores.primary() == target {
        return scores;
    }
    let mut p = scores.product_bug;
    let mut a = scores.automation_bug;
    let mut i = scores.infrastructure;
    match target {
        Classification::ProductBug => p += 0.5,
        Classification::AutomationBug => a += 0.5,
        Classification::Infrastructure => i += 0.5,
    }
    ClassificationScores::new(p, a, i)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EvidencePackageBuilder {
    matrix: ClassificationDecisionMatrix,
    calculator: ConfidenceCalculator,
    validator: CrossReferenceValidator,
}

impl EvidencePackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_for_test(
        &self,
        test_name: &str,
        error_message: &str,
        stack_trace: &str,
        environment: &EnvironmentInput,
        repository: &RepositoryInput,
        console: &ConsoleInput,
    ) -> TestFailurePackage {
        let category = categorize_failure(error_message);
        let selector_found = repository.selector_found.unwrap_or(false);
        let console_evidence = console.to_evidence();

        let adjustments = AdjustmentFactors {
            console_500_error: console_evidence.has_500_errors,
            selector_recently_changed: repository.selector_recently_changed.unwrap_or(false),
            console_connection_refused: console_evidence.has_connection_refused,
        };

        let classification_result = self.matrix.classify(category.as_str(), environment.healthy, selector_found, adjustments);

        let completeness = EvidenceCompleteness {
            has_stack_trace: !stack_trace.trim().is_empty(),
            has_parsed_frames: !stack_trace.trim().is_empty(),
            has_root_cause_file: false,
            has_environment_status: true,
            has_repository_analysis: repository.clone_succeeded,
            has_selector_lookup: repository.selector_found.is_some(),
            has_git_history: repository.git_history_age.is_some(),
            has_console_errors: !console.key_errors.is_empty(),
            has_test_file_content: false,
        };

        let selector_certainty = match repository.selector_found {
            Some(_) => SelectorCertainty::Known,
            None => SelectorCertainty::Unknown,
        };
        let history_signal = match repository.selector_recently_changed {
            Some(true) => HistorySignal::Supports,
            Some(false) => HistorySignal::Contradicts,
            None => HistorySignal::NoHistory,
        };

        let base_confidence = self.calculator.calculate(
            &classification_result.scores,
            completeness,
            &SourceConsistency::default(),
            selector_certainty,
            history_signal,
        );

        let validation_context = ValidationContext {
            console_has_500_errors: console_evidence.has_500_errors,
            cluster_accessible: environment.accessible,
            env_healthy: environment.healthy,
            selector_recently_changed: repository.selector_recently_changed.unwrap_or(false),
            selector_found,
            is_element_not_found: category == FailureType::ElementNotFound,
        };

        let outcome = self
            .validator
            .validate(classification_result.classification, base_confidence.final_confidence, &validation_context);

        let final_scores = boost_toward(classification_result.scores, outcome.final_classification);
        let final_confidence = ConfidenceBreakdown {
            final_confidence: outcome.final_confidence,
            confidence_level: ConfidenceLevel::from_score(outcome.final_confidence),
            ..base_confidence
        };

        let root_cause = stack_trace
            .lines()
            .find_map(|line| line.trim().strip_prefix("at ").map(|rest| rest.to_string()))
            .map(|location| RootCauseLocation {
                file: location,
                line: 0,
            });

        let test_evidence = TestFailureEvidence::new(test_name, error_message, category, root_cause);

        let repository_evidence = RepositoryEvidence {
            clone_succeeded: repository.clone_succeeded,
            branch: repository.branch.clone().unwrap_or_default(),
            selector_lookup: repository.selector_found.map(|found| SelectorLookup {
                found,
                recently_changed: repository.selector_recently_changed,
            }),
            git_history_age: repository.git_history_age,
        };

        let environment_evidence = EnvironmentEvidence {
            healthy: environment.healthy,
            accessible: environment.accessible,
            api_accessible: environment.api_accessible,
            target_cluster: environment.target_cluster.clone(),
        };

        TestFailurePackage {
            test: test_evidence,
            repository: Some(repository_evidence),
            environment: Some(environment_evidence),
            console: Some(console_evidence),
            scores: final_scores,
            confidence: final_confidence,
        }
    }

    pub fn build_package(
        &self,
        jenkins_url: &str,
        build_number: &str,
        failed_tests: &[FailedTestInput],
        environment: &EnvironmentInput,
        repository: &RepositoryInput,
        console: &ConsoleInput,
    ) -> AggregatedEvidencePackage {
        let per_test: Vec<TestFailurePackage> = failed_tests
            .iter()
            .map(|test| self.build_for_test(&test.test_name, &test.error_message, &test.stack_trace, environment, repository, console))
            .collect();

        AggregatedEvidencePackage::new(jenkins_url, build_number, per_test)
    }
}
