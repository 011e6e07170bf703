//! Deterministic three-way classification of a test failure (spec §4.4.1).
//!
//! A `(failure_type, env_healthy, selector_found)` triple maps to a base
//! `(product, automation, infrastructure)` score triple; optional adjustment
//! factors apply additive deltas before the triple is renormalized through
//! [`ClassificationScores::new`].

use qe_core::{Classification, ClassificationScores, ConfidenceBreakdown, FailureType};

/// Optional signals that nudge the base matrix entry before renormalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustmentFactors {
    pub console_500_error: bool,
    pub selector_recently_changed: bool,
    pub console_connection_refused: bool,
}

#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub confidence: f64,
    pub reasoning: String,
    pub evidence: Vec<String>,
    pub adjustments: Vec<String>,
    pub scores: ClassificationScores,
}

/// Base matrix entry for a `(failure_type, env_healthy, selector_found)`
/// triple. `selector_found` only discriminates the entry for
/// `element_not_found`; every other failure type is keyed on
/// `(failure_type, env_healthy)` alone, matching the normative table in
/// spec.md §4.4.1. Combinations the table leaves unspecified extrapolate
/// from the nearest specified entry, shifting weight toward infrastructure
/// when the environment is unhealthy.
pub fn matrix_entry(failure_type: FailureType, env_healthy: bool, selector_found: bool) -> (f64, f64, f64) {
    use FailureType::*;
    match failure_type {
        ServerError => (0.90, 0.05, 0.05),
        ElementNotFound => match (env_healthy, selector_found) {
            (true, true) => (0.20, 0.70, 0.10),
            (true, false) => (0.70, 0.20, 0.10),
            (false, true) => (0.10, 0.40, 0.50),
            (false, false) => (0.40, 0.10, 0.50),
        },
        Timeout => {
            if env_healthy {
                (0.15, 0.70, 0.15)
            } else {
                (0.10, 0.20, 0.70)
            }
        }
        Network => {
            if env_healthy {
                (0.20, 0.60, 0.20)
            } else {
                (0.05, 0.10, 0.85)
            }
        }
        Assertion => {
            if env_healthy {
                (0.65, 0.25, 0.10)
            } else {
                (0.30, 0.20, 0.50)
            }
        }
        AuthError => {
            if env_healthy {
                (0.15, 0.70, 0.15)
            } else {
                (0.10, 0.20, 0.70)
            }
        }
        Unknown => (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
    }
}

fn reasoning_for(failure_type: FailureType, env_healthy: bool, classification: Classification) -> String {
    let env_word = if env_healthy { "healthy" } else { "unhealthy" };
    match failure_type {
        FailureType::ServerError => format!(
            "a 500-class server error in a {env_word} environment is classified as {classification}"
        ),
        FailureType::Unknown => format!("no recognized failure category; defaulting toward {classification} with a neutral prior"),
        other => format!("{} in a {env_word} environment is classified as {classification}", other.as_str()),
    }
}

/// The decision matrix: stateless lookup plus adjustment-factor application.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationDecisionMatrix;

impl ClassificationDecisionMatrix {
    pub fn new() -> Self {
        Self
    }

    /// Raw, pre-normalization matrix entry for direct inspection.
    pub fn get_matrix_entry(&self, failure_type: &str, env_healthy: bool, selector_found: bool) -> (f64, f64, f64) {
        matrix_entry(FailureType::parse(failure_type), env_healthy, selector_found)
    }

    pub fn classify(
        &self,
        failure_type: &str,
        env_healthy: bool,
        selector_found: bool,
        additional_factors: AdjustmentFactors,
    ) -> ClassificationResult {
        let ft = FailureType::parse(failure_type);
        let (mut p, mut a, mut i) = matrix_entry(ft, env_healthy, selector_found);

        let mut adjustments = Vec::new();
        if additional_factors.console_500_error {
            p += 0.3;
            a -= 0.15;
            i -= 0.15;
            adjustments.push("console_500_error: +product_bug, -automation_bug, -infrastructure".to_string());
        }
        if additional_factors.selector_recently_changed {
            a += 0.3;
            p -= 0.15;
            adjustments.push("selector_recently_changed: +automation_bug, -product_bug".to_string());
        }
        if additional_factors.console_connection_refused {
            i += 0.3;
            a -= 0.15;
            adjustments.push("console_connection_refused: +infrastructure, -automation_bug".to_string());
        }

        let scores = ClassificationScores::new(p.max(0.0), a.max(0.0), i.max(0.0));
        let classification = scores.primary();
        let confidence = ConfidenceBreakdown::clamp_confidence(scores.separation());

        let evidence = vec![
            format!("failure_type classified as {}", ft.as_str()),
            format!("environment_healthy={}", env_healthy),
            format!("selector_found={}", selector_found),
        ];

        ClassificationResult {
            reasoning: reasoning_for(ft, env_healthy, classification),
            classification,
            confidence,
            evidence,
            adjustments,
            scores,
        }
    }
}

/// Convenience entry point mirroring the matrix's defaults: a healthy
/// environment with the selector present, unless told otherwise.
pub fn classify_failure(
    failure_type: &str,
    env_healthy: bool,
    selector_found: bool,
    additional_factors: AdjustmentFactors,
) -> ClassificationResult {
    ClassificationDecisionMatrix::new().classify(failure_type, env_healthy, selector_found, additional_factors)
}
