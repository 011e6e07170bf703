//! Cross-reference validator: a priority-ordered rules engine that may
//! correct, confirm, or flag a classification after the decision matrix and
//! confidence calculator have run (spec §4.4.3).

use qe_core::Classification;

/// The console/environment/selector signals the validator rules consult.
/// Not every signal is populated for every test failure — absent fields are
/// treated as "rule does not apply".
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext {
    pub console_has_500_errors: bool,
    pub cluster_accessible: bool,
    pub env_healthy: bool,
    pub selector_recently_changed: bool,
    pub selector_found: bool,
    pub is_element_not_found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationAction {
    Correct,
    Confirm,
    Flag,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub action: ValidationAction,
    pub final_classification: Classification,
    pub final_confidence: f64,
    pub was_corrected: bool,
    pub rule: Option<&'static str>,
    pub note: Option<String>,
}

struct Rule {
    name: &'static str,
    /// Returns `Some(delta)` if the rule fires, where delta is applied to
    /// confidence; `None` means the rule didn't trigger.
    apply: fn(Classification, &ValidationContext) -> Option<(ValidationAction, Option<Classification>, f64)>,
}

const CONFIDENCE_DELTA: f64 = 0.1;

/// Rules in priority order — the first one that fires wins; ties (multiple
/// simultaneous triggers) are broken by this ordering, i.e. the strongest
/// applicable correction wins.
fn rules() -> [Rule; 6] {
    [
        Rule {
            name: "500_overrides_automation",
            apply: |classification, ctx| {
                if classification == Classification::AutomationBug && ctx.console_has_500_errors {
                    Some((ValidationAction::Correct, Some(Classification::ProductBug), CONFIDENCE_DELTA))
                } else {
                    None
                }
            },
        },
        Rule {
            name: "500_confirms_product",
            apply: |classification, ctx| {
                if classification == Classification::ProductBug && ctx.console_has_500_errors {
                    Some((ValidationAction::Confirm, None, CONFIDENCE_DELTA))
                } else {
                    None
                }
            },
        },
        Rule {
            name: "cluster_unhealthy_overrides_automation",
            apply: |classification, ctx| {
                if classification == Classification::AutomationBug && !ctx.cluster_accessible {
                    Some((ValidationAction::Correct, Some(Classification::Infrastructure), 0.0))
                } else {
                    None
                }
            },
        },
        Rule {
            name: "infra_with_healthy_env_flags",
            apply: |classification, ctx| {
                if classification == Classification::Infrastructure && ctx.cluster_accessible && ctx.env_healthy {
                    Some((ValidationAction::Flag, None, -CONFIDENCE_DELTA))
                } else {
                    None
                }
            },
        },
        Rule {
            name: "selector_change_confirms_automation",
            apply: |classification, ctx| {
                if classification == Classification::AutomationBug && ctx.selector_recently_changed {
                    Some((ValidationAction::Confirm, None, CONFIDENCE_DELTA))
                } else {
                    None
                }
            },
        },
        Rule {
            name: "selector_missing_overrides_automation",
            apply: |classification, ctx| {
                if classification == Classification::AutomationBug && ctx.is_element_not_found && !ctx.selector_found {
                    Some((ValidationAction::Correct, Some(Classification::ProductBug), 0.0))
                } else {
                    None
                }
            },
        },
    ]
}

/// Stateless rules engine: applies the first firing rule in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossReferenceValidator;

impl CrossReferenceValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, classification: Classification, confidence: f64, context: &ValidationContext) -> ValidationOutcome {
        for rule in rules() {
            if let Some((action, correction, delta)) = (rule.apply)(classification, context) {
                let final_classification = correction.unwrap_or(classification);
                let final_confidence = (confidence + delta).clamp(0.1, 0.95);
                return ValidationOutcome {
                    action,
                    final_classification,
                    final_confidence,
                    was_corrected: correction.is_some(),
                    rule: Some(rule.name),
                    note: None,
                };
            }
        }

        ValidationOutcome {
            action: ValidationAction::Unchanged,
            final_classification: classification,
            final_confidence: confidence.clamp(0.1, 0.95),
            was_corrected: false,
            rule: None,
            note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_in_console_overrides_automation_classification() {
        let validator = CrossReferenceValidator::new();
        let context = ValidationContext {
            console_has_500_errors: true,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::AutomationBug, 0.7, &context);
        assert!(outcome.was_corrected);
        assert_eq!(outcome.final_classification, Classification::ProductBug);
        assert!(outcome.final_confidence > 0.7);
    }

    #[test]
    fn server_error_confirms_existing_product_bug() {
        let validator = CrossReferenceValidator::new();
        let context = ValidationContext {
            console_has_500_errors: true,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::ProductBug, 0.6, &context);
        assert_eq!(outcome.action, ValidationAction::Confirm);
        assert!(!outcome.was_corrected);
        assert_eq!(outcome.final_classification, Classification::ProductBug);
    }

    #[test]
    fn unhealthy_cluster_overrides_automation_to_infrastructure() {
        let validator = CrossReferenceValidator::new();
        let context = ValidationContext {
            cluster_accessible: false,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::AutomationBug, 0.6, &context);
        assert!(outcome.was_corrected);
        assert_eq!(outcome.final_classification, Classification::Infrastructure);
    }

    #[test]
    fn infrastructure_with_healthy_accessible_env_is_flagged() {
        let validator = CrossReferenceValidator::new();
        let context = ValidationContext {
            cluster_accessible: true,
            env_healthy: true,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::Infrastructure, 0.6, &context);
        assert_eq!(outcome.action, ValidationAction::Flag);
        assert!(outcome.final_confidence < 0.6);
    }

    #[test]
    fn selector_missing_overrides_automation_on_element_not_found() {
        let validator = CrossReferenceValidator::new();
        let context = ValidationContext {
            is_element_not_found: true,
            selector_found: false,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::AutomationBug, 0.6, &context);
        assert!(outcome.was_corrected);
        assert_eq!(outcome.final_classification, Classification::ProductBug);
    }

    #[test]
    fn strongest_correction_wins_when_multiple_rules_trigger() {
        let validator = CrossReferenceValidator::new();
        // Both the 500-override and the cluster-unhealthy-override rules
        // would fire; priority order picks the 500 override first.
        let context = ValidationContext {
            console_has_500_errors: true,
            cluster_accessible: false,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::AutomationBug, 0.6, &context);
        assert_eq!(outcome.rule, Some("500_overrides_automation"));
        assert_eq!(outcome.final_classification, Classification::ProductBug);
    }

    #[test]
    fn unrelated_classification_is_left_unchanged() {
        let validator = CrossReferenceValidator::new();
        let outcome = validator.validate(Classification::ProductBug, 0.5, &ValidationContext::default());
        assert_eq!(outcome.action, ValidationAction::Unchanged);
        assert!(!outcome.was_corrected);
    }

    #[test]
    fn final_confidence_is_always_clamped() {
        let validator = CrossReferenceValidator::new();
        let context = ValidationContext {
            console_has_500_errors: true,
            ..Default::default()
        };
        let outcome = validator.validate(Classification::AutomationBug, 0.94, &context);
        assert!(outcome.final_confidence <= 0.95);
    }
}
