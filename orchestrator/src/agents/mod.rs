//! The five investigation agents (spec §4.1): A (JIRA), B (documentation),
//! C (GitHub), D (environment), plus the QE Intelligence service consumed
//! in Phase 2.5.

pub mod documentation;
pub mod environment;
pub mod github;
pub mod jira;
pub mod qe;

pub use documentation::DocumentationAgent;
pub use environment::EnvironmentAgent;
pub use github::GitHubAgent;
pub use jira::JiraAgent;
