//! Recognizes known subsystem component identifiers inside error messages,
//! stack traces, and console logs (spec §4.6).

use std::collections::HashMap;

/// Which subsystem a component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Search,
    Governance,
    ClusterManagement,
    Provisioning,
    Observability,
    Virtualization,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Search => "Search",
            Subsystem::Governance => "Governance",
            Subsystem::ClusterManagement => "Cluster Management",
            Subsystem::Provisioning => "Provisioning",
            Subsystem::Observability => "Observability",
            Subsystem::Virtualization => "Virtualization",
        }
    }
}

/// Where an extracted component was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSource {
    ErrorMessage,
    StackTrace,
    ConsoleLog,
}

impl ComponentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentSource::ErrorMessage => "error_message",
            ComponentSource::StackTrace => "stack_trace",
            ComponentSource::ConsoleLog => "console_log",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedComponent {
    pub name: String,
    pub source: ComponentSource,
    /// A bounded window of characters around the match.
    pub context: String,
}

/// Window of characters kept on each side of a match when building `context`.
const CONTEXT_RADIUS: usize = 40;

fn catalog() -> &'static [(&'static str, Subsystem)] {
    &[
        // Search
        ("search-api", Subsystem::Search),
        ("search-collector", Subsystem::Search),
        ("search-indexer", Subsystem::Search),
        ("search-v2-operator", Subsystem::Search),
        ("search-postgres", Subsystem::Search),
        ("console-search", Subsystem::Search),
        // Governance
        ("grc-policy-propagator", Subsystem::Governance),
        ("config-policy-controller", Subsystem::Governance),
        ("governance-policy-framework", Subsystem::Governance),
        ("cert-policy-controller", Subsystem::Governance),
        ("iam-policy-controller", Subsystem::Governance),
        ("governance-policy-spec-sync", Subsystem::Governance),
        ("governance-policy-status-sync", Subsystem::Governance),
        ("governance-policy-template-sync", Subsystem::Governance),
        // Cluster Management
        ("cluster-curator", Subsystem::ClusterManagement),
        ("managedcluster-import-controller", Subsystem::ClusterManagement),
        ("klusterlet", Subsystem::ClusterManagement),
        ("registration-operator", Subsystem::ClusterManagement),
        ("work-manager", Subsystem::ClusterManagement),
        ("clusterlifecycle-state-metrics", Subsystem::ClusterManagement),
        ("cluster-permission", Subsystem::ClusterManagement),
        ("cluster-proxy-addon", Subsystem::ClusterManagement),
        ("multicloud-operators-foundation", Subsystem::ClusterManagement),
        // Provisioning
        ("hive", Subsystem::Provisioning),
        ("hypershift", Subsystem::Provisioning),
        ("assisted-service", Subsystem::Provisioning),
        ("assisted-image-service", Subsystem::Provisioning),
        ("cluster-image-set-controller", Subsystem::Provisioning),
        ("provider-credential-controller", Subsystem::Provisioning),
        ("siteconfig-operator", Subsystem::Provisioning),
        // Observability
        ("thanos-query", Subsystem::Observability),
        ("thanos-receive", Subsystem::Observability),
        ("thanos-rule", Subsystem::Observability),
        ("thanos-store", Subsystem::Observability),
        ("observability-operator", Subsystem::Observability),
        ("grafana", Subsystem::Observability),
        ("alertmanager", Subsystem::Observability),
        ("metrics-collector", Subsystem::Observability),
        ("rbac-query-proxy", Subsystem::Observability),
        // Virtualization
        ("virt-api", Subsystem::Virtualization),
        ("virt-controller", Subsystem::Virtualization),
        ("virt-handler", Subsystem::Virtualization),
        ("virt-launcher", Subsystem::Virtualization),
        ("kubevirt-operator", Subsystem::Virtualization),
        ("cdi-operator", Subsystem::Virtualization),
        ("cdi-apiserver", Subsystem::Virtualization),
        ("hco-operator", Subsystem::Virtualization),
        ("hostpath-provisioner", Subsystem::Virtualization),
    ]
}

fn is_word_boundary(byte: Option<u8>) -> bool {
    match byte {
        None => true,
        Some(b) => !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'),
    }
}

fn find_whole_word_matches(haystack: &str, needle: &str) -> Vec<usize> {
    let lower = haystack.to_lowercase();
    let needle_lower = needle.to_lowercase();
    let mut matches = Vec::new();
    let mut start = 0;
    while let Some(pos) = lower[start..].find(&needle_lower) {
        let abs = start + pos;
        let before = if abs == 0 { None } else { Some(lower.as_bytes()[abs - 1]) };
        let after_idx = abs + needle_lower.len();
        let after = lower.as_bytes().get(after_idx).copied();
        if is_word_boundary(before) && is_word_boundary(after) {
            matches.push(abs);
        }
        start = abs + needle_lower.len().max(1);
    }
    matches
}

fn context_window(text: &str, match_start: usize, match_len: usize) -> String {
    let start = match_start.saturating_sub(CONTEXT_RADIUS);
    let end = (match_start + match_len + CONTEXT_RADIUS).min(text.len());
    // `start`/`end` are byte offsets from an ASCII-safe search above; text
    // may still contain multi-byte chars elsewhere, so snap to char boundaries.
    let mut start = start;
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = end;
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

/// Recognizes known subsystem components in error text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentExtractor;

impl ComponentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Subsystem a known component belongs to, if recognized.
    pub fn get_subsystem(&self, component: &str) -> Option<Subsystem> {
        catalog()
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(component))
            .map(|(_, subsystem)| *subsystem)
    }

    pub fn get_component_list(&self) -> Vec<&'static str> {
        catalog().iter().map(|(name, _)| *name).collect()
    }

    pub fn get_components_by_subsystem(&self, subsystem: Subsystem) -> Vec<&'static str> {
        catalog().iter().filter(|(_, s)| *s == subsystem).map(|(name, _)| *name).collect()
    }

    fn extract_with_source(&self, text: &str, source: ComponentSource) -> Vec<ExtractedComponent> {
        let mut found = Vec::new();
        for (name, _) in catalog() {
            for start in find_whole_word_matches(text, name) {
                found.push(ExtractedComponent {
                    name: name.to_string(),
                    source,
                    context: context_window(text, start, name.len()),
                });
            }
        }
        found
    }

    pub fn extract_from_error(&self, error_message: &str) -> Vec<ExtractedComponent> {
        self.extract_with_source(error_message, ComponentSource::ErrorMessage)
    }

    pub fn extract_from_stack_trace(&self, stack_trace: &str) -> Vec<ExtractedComponent> {
        self.extract_with_source(stack_trace, ComponentSource::StackTrace)
    }

    /// Extracts from a multi-line console log. When `error_lines_only` is
    /// set, only lines containing `error`/`fail`/`exception` (case
    /// insensitive) are scanned.
    pub fn extract_from_console_log(&self, console_log: &str, error_lines_only: bool) -> Vec<ExtractedComponent> {
        let mut found = Vec::new();
        for line in console_log.lines() {
            let lower = line.to_lowercase();
            let relevant = !error_lines_only || lower.contains("error") || lower.contains("fail") || lower.contains("exception");
            if relevant {
                found.extend(self.extract_with_source(line, ComponentSource::ConsoleLog));
            }
        }
        found
    }

    /// Deduplicated components across a whole test failure. A component
    /// matched in more than one source keeps only its first-found entry, in
    /// `error_message → stack_trace → console_log` precedence.
    pub fn extract_all_from_test_failure(&self, error_message: &str, stack_trace: &str, console_log: &str) -> Vec<ExtractedComponent> {
        let mut seen: HashMap<String, ExtractedComponent> = HashMap::new();
        for component in self
            .extract_from_error(error_message)
            .into_iter()
            .chain(self.extract_from_stack_trace(stack_trace))
            .chain(self.extract_from_console_log(console_log, true))
        {
            seen.entry(component.name.clone()).or_insert(component);
        }
        let mut result: Vec<ExtractedComponent> = seen.into_values().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_known_component_from_error_message() {
        let extractor = ComponentExtractor::new();
        let found = extractor.extract_from_error("connection to search-api timed out after 30s");
        assert!(found.iter().any(|c| c.name == "search-api"));
    }

    #[test]
    fn whole_word_matching_rejects_substring_matches() {
        let extractor = ComponentExtractor::new();
        // "hive" must not match inside "archive"
        let found = extractor.extract_from_error("failed to read archive file");
        assert!(!found.iter().any(|c| c.name == "hive"));
    }

    #[test]
    fn whole_word_matching_accepts_standalone_token() {
        let extractor = ComponentExtractor::new();
        let found = extractor.extract_from_error("hive controller failed to reconcile ClusterDeployment");
        assert!(found.iter().any(|c| c.name == "hive"));
    }

    #[test]
    fn case_insensitive_matching() {
        let extractor = ComponentExtractor::new();
        let found = extractor.extract_from_error("Thanos-Query returned an error");
        assert!(found.iter().any(|c| c.name == "thanos-query"));
    }

    #[test]
    fn get_subsystem_resolves_known_component() {
        let extractor = ComponentExtractor::new();
        assert_eq!(extractor.get_subsystem("grc-policy-propagator"), Some(Subsystem::Governance));
        assert_eq!(extractor.get_subsystem("not-a-real-component"), None);
    }

    #[test]
    fn extract_all_deduplicates_across_sources() {
        let extractor = ComponentExtractor::new();
        let found = extractor.extract_all_from_test_failure("virt-api panicked", "at virt-api::handler\n  virt-api again", "virt-api error in console");
        assert_eq!(found.iter().filter(|c| c.name == "virt-api").count(), 1);
    }

    #[test]
    fn console_log_error_lines_only_skips_clean_lines() {
        let extractor = ComponentExtractor::new();
        let log = "starting virt-launcher\nvirt-launcher error: crash loop";
        let found = extractor.extract_from_console_log(log, true);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn context_window_is_bounded() {
        let extractor = ComponentExtractor::new();
        let long_prefix = "x".repeat(200);
        let text = format!("{long_prefix} hive failed {}", "y".repeat(200));
        let found = extractor.extract_from_error(&text);
        let hive = found.iter().find(|c| c.name == "hive").unwrap();
        assert!(hive.context.len() < text.len());
    }

    #[test]
    fn components_by_subsystem_returns_only_matching_entries() {
        let extractor = ComponentExtractor::new();
        let virt_components = extractor.get_components_by_subsystem(Subsystem::Virtualization);
        assert!(virt_components.contains(&"kubevirt-operator"));
        assert!(!virt_components.contains(&"hive"));
    }
}
