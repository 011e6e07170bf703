//! Weighted confidence calculation (spec §4.4.2).

use qe_core::{ClassificationScores, ConfidenceBreakdown, ConfidenceLevel};

/// The nine binary evidence flags that feed `evidence_completeness`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceCompleteness {
    pub has_stack_trace: bool,
    pub has_parsed_frames: bool,
    pub has_root_cause_file: bool,
    pub has_environment_status: bool,
    pub has_repository_analysis: bool,
    pub has_selector_lookup: bool,
    pub has_git_history: bool,
    pub has_console_errors: bool,
    pub has_test_file_content: bool,
}

impl EvidenceCompleteness {
    const FLAG_COUNT: f64 = 9.0;

    pub fn completeness_score(&self) -> f64 {
        let present = [
            self.has_stack_trace,
            self.has_parsed_frames,
            self.has_root_cause_file,
            self.has_environment_status,
            self.has_repository_analysis,
            self.has_selector_lookup,
            self.has_git_history,
            self.has_console_errors,
            self.has_test_file_content,
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        present as f64 / Self::FLAG_COUNT
    }
}

/// Whether the sources that contributed a suggestion (repository analysis,
/// console evidence, environment evidence, ...) agree on a dominant
/// classification.
#[derive(Debug, Clone, Default)]
pub struct SourceConsistency {
    /// One suggested classification label per contributing source, e.g.
    /// `["product_bug", "product_bug", "infrastructure"]`.
    pub suggestions: Vec<String>,
}

impl SourceConsistency {
    /// `(count agreeing with the dominant suggestion) / (sources present)`;
    /// defaults to `0.5` when fewer than two sources contributed, since
    /// agreement isn't meaningful with zero or one source.
    pub fn consistency_score(&self) -> f64 {
        if self.suggestions.len() < 2 {
            return 0.5;
        }
        let dominant = self.dominant_suggestion();
        match dominant {
            Some(label) => {
                let agreeing = self.suggestions.iter().filter(|s| **s == label).count();
                agreeing as f64 / self.suggestions.len() as f64
            }
            None => 0.5,
        }
    }

    /// The most frequently suggested label, ties broken by first occurrence.
    pub fn dominant_suggestion(&self) -> Option<String> {
        if self.suggestions.is_empty() {
            return None;
        }
        let mut counts: Vec<(String, usize)> = Vec::new();
        for s in &self.suggestions {
            if let Some(entry) = counts.iter_mut().find(|(label, _)| label == s) {
                entry.1 += 1;
            } else {
                counts.push((s.clone(), 1));
            }
        }
        counts.into_iter().max_by_key(|(_, count)| *count).map(|(label, _)| label)
    }
}

/// Selector certainty: high when the selector's presence (and, if present,
/// its recent-change status) is known; low when nothing is known about it.
#[derive(Debug, Clone, Copy)]
pub enum SelectorCertainty {
    /// Selector known to exist and recently changed, or known not to exist.
    Known,
    /// No selector lookup was performed.
    Unknown,
}

impl SelectorCertainty {
    pub fn score(&self) -> f64 {
        match self {
            SelectorCertainty::Known => 0.8,
            SelectorCertainty::Unknown => 0.4,
        }
    }
}

/// Whether git history supports or contradicts the classification.
#[derive(Debug, Clone, Copy)]
pub enum HistorySignal {
    Supports,
    Contradicts,
    NoHistory,
}

impl HistorySignal {
    pub fn score(&self) -> f64 {
        match self {
            HistorySignal::Supports => 0.8,
            HistorySignal::Contradicts => 0.2,
            HistorySignal::NoHistory => 0.5,
        }
    }
}

/// Per-factor weights from spec.md §4.4.2. Configurable, defaults sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    pub score_separation: f64,
    pub evidence_completeness: f64,
    pub source_consistency: f64,
    pub selector_certainty: f64,
    pub history_signal: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            score_separation: 0.25,
            evidence_completeness: 0.25,
            source_consistency: 0.20,
            selector_certainty: 0.15,
            history_signal: 0.15,
        }
    }
}

/// Per-factor warning threshold: any contributing factor below this value
/// emits a warning naming it.
const WARNING_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceCalculator {
    weights: ConfidenceWeights,
}

impl Default for ConfidenceCalculator {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
        }
    }
}

impl ConfidenceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ConfidenceWeights) -> Self {
        Self { weights }
    }

    pub fn calculate(
        &self,
        scores: &ClassificationScores,
        completeness: EvidenceCompleteness,
        consistency: &SourceConsistency,
        selector_certainty: SelectorCertainty,
        history_signal: HistorySignal,
    ) -> ConfidenceBreakdown {
        let w = self.weights;

        let score_separation = scores.separation();
        let evidence_completeness = completeness.completeness_score();
        let source_consistency = consistency.consistency_score();
        let selector_certainty_score = selector_certainty.score();
        let history_signal_score = history_signal.score();

        let raw = w.score_separation * score_separation
            + w.evidence_completeness * evidence_completeness
            + w.source_consistency * source_consistency
            + w.selector_certainty * selector_certainty_score
            + w.history_signal * history_signal_score;

        let final_confidence = ConfidenceBreakdown::clamp_confidence(raw);
        let confidence_level = ConfidenceLevel::from_score(final_confidence);

        let mut warnings = Vec::new();
        if score_separation < WARNING_THRESHOLD {
            warnings.push("low score separation between classifications".to_string());
        }
        if evidence_completeness < WARNING_THRESHOLD {
            warnings.push("incomplete evidence: fewer than half of the expected signals were present".to_string());
        }
        if source_consistency < WARNING_THRESHOLD {
            warnings.push("sources disagree on the dominant classification".to_string());
        }
        if selector_certainty_score < WARNING_THRESHOLD {
            warnings.push("selector status is unknown".to_string());
        }
        if history_signal_score < WARNING_THRESHOLD {
            warnings.push("git history contradicts the classification".to_string());
        }

        ConfidenceBreakdown {
            score_separation,
            evidence_completeness,
            source_consistency,
            selector_certainty: selector_certainty_score,
            history_signal: history_signal_score,
            final_confidence,
            confidence_level,
            warnings,
        }
    }
}

/// Shortcut for callers that only have a score separation and a coarse
/// "do we have the full evidence package or not" signal — used where a full
/// [`ConfidenceCalculator::calculate`] call isn't warranted.
pub fn quick_confidence(score_separation: f64, has_full_evidence: bool) -> f64 {
    let completeness = if has_full_evidence { 1.0 } else { 0.3 };
    let raw = 0.5 * score_separation + 0.5 * completeness;
    ConfidenceBreakdown::clamp_confidence(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_score_counts_true_flags() {
        let completeness = EvidenceCompleteness {
            has_stack_trace: true,
            has_environment_status: true,
            has_console_errors: true,
            ..Default::default()
        };
        assert!((completeness.completeness_score() - 3.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn consistency_defaults_to_half_with_fewer_than_two_sources() {
        let consistency = SourceConsistency {
            suggestions: vec!["product_bug".to_string()],
        };
        assert_eq!(consistency.consistency_score(), 0.5);
    }

    #[test]
    fn consistency_reflects_agreement_ratio() {
        let consistency = SourceConsistency {
            suggestions: vec!["product_bug".to_string(), "product_bug".to_string(), "infrastructure".to_string()],
        };
        assert!((consistency.consistency_score() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn calculate_clamps_to_bounds() {
        let calculator = ConfidenceCalculator::new();
        let scores = ClassificationScores::new(0.9, 0.05, 0.05);
        let breakdown = calculator.calculate(
            &scores,
            EvidenceCompleteness {
                has_stack_trace: true,
                has_parsed_frames: true,
                has_root_cause_file: true,
                has_environment_status: true,
                has_repository_analysis: true,
                has_selector_lookup: true,
                has_git_history: true,
                has_console_errors: true,
                has_test_file_content: true,
            },
            &SourceConsistency {
                suggestions: vec!["product_bug".to_string(), "product_bug".to_string()],
            },
            SelectorCertainty::Known,
            HistorySignal::Supports,
        );
        assert!(breakdown.final_confidence >= 0.1 && breakdown.final_confidence <= 0.95);
        assert_eq!(breakdown.confidence_level, ConfidenceLevel::High);
    }

    #[test]
    fn calculate_warns_on_weak_factors() {
        let calculator = ConfidenceCalculator::new();
        let scores = ClassificationScores::new(0.34, 0.33, 0.33);
        let breakdown = calculator.calculate(
            &scores,
            EvidenceCompleteness::default(),
            &SourceConsistency::default(),
            SelectorCertainty::Unknown,
            HistorySignal::NoHistory,
        );
        assert!(!breakdown.warnings.is_empty());
    }

    #[test]
    fn quick_confidence_rewards_full_evidence() {
        let with_evidence = quick_confidence(0.8, true);
        let without_evidence = quick_confidence(0.8, false);
        assert!(with_evidence > without_evidence);
    }

    #[test]
    fn quick_confidence_stays_within_bounds() {
        assert!(quick_confidence(0.0, false) >= 0.1);
        assert!(quick_confidence(1.0, true) <= 0.95);
    }
}
