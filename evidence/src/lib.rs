//! `qe-evidence` — deterministic failure classification, confidence
//! scoring, cross-reference validation, component extraction, and
//! knowledge-graph enrichment for Jenkins test-failure evidence (spec §4.4,
//! §4.5, §4.6).
//!
//! [`package_builder::EvidencePackageBuilder`] is the entry point most
//! callers want: it wires the decision matrix, confidence calculator, and
//! cross-reference validator together into a single
//! [`qe_core::TestFailurePackage`] per failing test.

pub mod components;
pub mod confidence;
pub mod cross_validation;
pub mod decision_matrix;
pub mod knowledge_graph;
pub mod package_builder;

pub use components::{ComponentExtractor, ComponentSource, ExtractedComponent, Subsystem};
pub use confidence::{ConfidenceCalculator, ConfidenceWeights, EvidenceCompleteness, HistorySignal, SelectorCertainty, SourceConsistency, quick_confidence};
pub use cross_validation::{CrossReferenceValidator, ValidationAction, ValidationContext, ValidationOutcome};
pub use decision_matrix::{AdjustmentFactors, ClassificationDecisionMatrix, ClassificationResult, classify_failure};
pub use knowledge_graph::{ComponentInfo, DependencyChain, GraphBackend, ImpactAnalysis, KnowledgeGraphClient, UnavailableBackend};
pub use package_builder::{ConsoleInput, EnvironmentInput, EvidencePackageBuilder, FailedTestInput, RepositoryInput, categorize_failure};
