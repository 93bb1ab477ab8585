use crate::relevance::ScoredSummary;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Facts merged across every HIGH and MEDIUM summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedContext {
    /// Sorted, deduplicated.
    pub tech_stack_added: Vec<String>,
    /// `tech-stack.patterns` and `patterns-established`; sorted, deduplicated.
    pub patterns_established: Vec<String>,
    /// Sorted, deduplicated.
    pub key_files_created: Vec<String>,
    /// Sorted, deduplicated.
    pub key_files_modified: Vec<String>,
    /// Deduplicated in first-seen order.
    pub key_decisions: Vec<String>,
}

pub fn aggregate_from_summaries(summaries: &[ScoredSummary]) -> AggregatedContext {
    let mut tech = BTreeSet::new();
    let mut patterns = BTreeSet::new();
    let mut created = BTreeSet::new();
    let mut modified = BTreeSet::new();
    let mut decisions = Vec::new();
    let mut seen_decisions = HashSet::new();

    for summary in summaries.iter().filter(|s| s.relevance.is_relevant()) {
        let fm = &summary.frontmatter;
        tech.extend(fm.nested_list("tech-stack", "added"));
        patterns.extend(fm.nested_list("tech-stack", "patterns"));
        patterns.extend(fm.list("patterns-established"));
        created.extend(fm.nested_list("key-files", "created"));
        modified.extend(fm.nested_list("key-files", "modified"));
        for decision in fm.list("key-decisions") {
            if seen_decisions.insert(decision.clone()) {
                decisions.push(decision);
            }
        }
    }

    AggregatedContext {
        tech_stack_added: tech.into_iter().collect(),
        patterns_established: patterns.into_iter().collect(),
        key_files_created: created.into_iter().collect(),
        key_files_modified: modified.into_iter().collect(),
        key_decisions: decisions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::parse_frontmatter;
    use crate::relevance::Relevance;

    fn summary(yaml: &str, relevance: Relevance) -> ScoredSummary {
        ScoredSummary {
            path: String::new(),
            frontmatter: parse_frontmatter(&format!("---\n{yaml}---\n")).unwrap(),
            relevance,
            match_reasons: Vec::new(),
            has_readiness_warnings: false,
        }
    }

    #[test]
    fn low_summaries_are_excluded() {
        let summaries = vec![
            summary("tech-stack:\n  added: [jose]\n", Relevance::High),
            summary("tech-stack:\n  added: [postgres]\n", Relevance::Low),
        ];
        let agg = aggregate_from_summaries(&summaries);
        assert_eq!(agg.tech_stack_added, vec!["jose"]);
    }

    #[test]
    fn sets_are_sorted_and_patterns_merged() {
        let summaries = vec![
            summary(
                "tech-stack:\n  added: [zod, axios]\n  patterns: repository\npatterns-established: [adapter, repository]\nkey-files:\n  created: src/b.rs\n  modified: [src/z.rs, src/a.rs]\n",
                Relevance::High,
            ),
            summary(
                "tech-stack:\n  added: axios\nkey-files:\n  created: [src/a.rs, src/b.rs]\n",
                Relevance::Medium,
            ),
        ];
        let agg = aggregate_from_summaries(&summaries);
        assert_eq!(agg.tech_stack_added, vec!["axios", "zod"]);
        assert_eq!(agg.patterns_established, vec!["adapter", "repository"]);
        assert_eq!(agg.key_files_created, vec!["src/a.rs", "src/b.rs"]);
        assert_eq!(agg.key_files_modified, vec!["src/a.rs", "src/z.rs"]);
    }

    #[test]
    fn decisions_keep_first_seen_order() {
        let summaries = vec![
            summary("key-decisions: [Use JWT, Short TTL]\n", Relevance::High),
            summary("key-decisions: Cookie storage\n", Relevance::Medium),
            summary("key-decisions: [Short TTL, Use JWT, Rotate keys]\n", Relevance::High),
        ];
        let agg = aggregate_from_summaries(&summaries);
        assert_eq!(
            agg.key_decisions,
            vec!["Use JWT", "Short TTL", "Cookie storage", "Rotate keys"]
        );
    }

    #[test]
    fn non_mapping_parents_are_ignored() {
        let summaries = vec![summary("tech-stack: [jose]\nkey-files: none\n", Relevance::High)];
        assert_eq!(aggregate_from_summaries(&summaries), AggregatedContext::default());
    }
}
