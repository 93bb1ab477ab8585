//! Multi-source scan of a `.planning/` corpus.
//!
//! Six independent collections are enumerated. Anything wrong with an
//! individual file or directory is recorded in the report and the scan moves
//! on; nothing here returns an error.

use crate::aggregate::{aggregate_from_summaries, AggregatedContext};
use crate::frontmatter::{has_readiness_section, parse_frontmatter, Frontmatter};
use crate::io;
use crate::paths::{self, Depth};
use crate::relevance::{
    apply_transitive_upgrade, resolve_transitive_requires, score_summary, ScanTarget,
    ScoredSummary,
};
use crate::root::{Planning, RootProvider};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DIR_NOT_FOUND: &str = "directory not found";
pub const PLANNING_NOT_FOUND: &str = ".planning/ not found";
pub const NO_VALID_FRONTMATTER: &str = "no valid frontmatter";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub dir: String,
    pub scanned: usize,
    pub skipped: Option<String>,
}

impl SourceInfo {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.display().to_string(),
            scanned: 0,
            skipped: None,
        }
    }

    fn planning_missing() -> Self {
        Self {
            dir: String::new(),
            scanned: 0,
            skipped: Some(PLANNING_NOT_FOUND.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sources {
    pub summaries: SourceInfo,
    pub debug_docs: SourceInfo,
    pub adhoc_summaries: SourceInfo,
    pub completed_todos: SourceInfo,
    pub pending_todos: SourceInfo,
    pub knowledge_files: SourceInfo,
    pub parse_errors: Vec<ParseError>,
}

impl Sources {
    /// `(name, info)` pairs in report order.
    pub fn named(&self) -> [(&'static str, &SourceInfo); 6] {
        [
            ("summaries", &self.summaries),
            ("debug_docs", &self.debug_docs),
            ("adhoc_summaries", &self.adhoc_summaries),
            ("completed_todos", &self.completed_todos),
            ("pending_todos", &self.pending_todos),
            ("knowledge_files", &self.knowledge_files),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugLearning {
    pub path: String,
    pub slug: String,
    pub subsystem: String,
    pub root_cause: String,
    pub resolution: String,
    pub tags: Vec<String>,
    pub phase: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdhocLearning {
    pub path: String,
    pub subsystem: String,
    pub learnings: Vec<String>,
    pub related_phase: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoItem {
    pub path: String,
    pub title: String,
    pub subsystem: String,
    pub priority: String,
    pub estimate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeFile {
    pub path: String,
    pub subsystem: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub success: bool,
    /// False when no `.planning/` corpus was found at all.
    #[serde(skip)]
    pub planning_found: bool,
    pub target: ScanTarget,
    pub sources: Sources,
    pub summaries: Vec<ScoredSummary>,
    pub debug_learnings: Vec<DebugLearning>,
    pub adhoc_learnings: Vec<AdhocLearning>,
    pub completed_todos: Vec<TodoItem>,
    pub pending_todos: Vec<TodoItem>,
    pub knowledge_files: Vec<KnowledgeFile>,
    pub aggregated: AggregatedContext,
}

impl ScanReport {
    /// Well-formed result for a repository with no planning corpus.
    pub fn without_corpus(target: ScanTarget) -> Self {
        Self {
            success: true,
            planning_found: false,
            target,
            sources: Sources {
                summaries: SourceInfo::planning_missing(),
                debug_docs: SourceInfo::planning_missing(),
                adhoc_summaries: SourceInfo::planning_missing(),
                completed_todos: SourceInfo::planning_missing(),
                pending_todos: SourceInfo::planning_missing(),
                knowledge_files: SourceInfo::planning_missing(),
                parse_errors: Vec::new(),
            },
            summaries: Vec::new(),
            debug_learnings: Vec::new(),
            adhoc_learnings: Vec::new(),
            completed_todos: Vec::new(),
            pending_todos: Vec::new(),
            knowledge_files: Vec::new(),
            aggregated: AggregatedContext::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Scan the corpus under the provider's root, or return an empty report.
pub fn scan_planning_context(provider: &dyn RootProvider, target: ScanTarget) -> ScanReport {
    match Planning::discover(provider) {
        Some(planning) => scan_planning_dir(planning.dir(), target),
        None => {
            tracing::debug!("no .planning/ directory; returning empty scan");
            ScanReport::without_corpus(target)
        }
    }
}

/// Scan every source under an existing `.planning/` directory.
pub fn scan_planning_dir(planning: &Path, target: ScanTarget) -> ScanReport {
    let mut errors = Vec::new();

    let (summaries, summaries_src) = scan_summaries(planning, &target, &mut errors);
    let (debug_learnings, debug_src) = scan_debug_docs(planning, &mut errors);
    let (adhoc_learnings, adhoc_src) = scan_adhoc_summaries(planning, &mut errors);
    let (completed_todos, completed_src) =
        scan_todos(planning, paths::TODOS_DONE_DIR, "done/", &mut errors);
    let (pending_todos, pending_src) =
        scan_todos(planning, paths::TODOS_DIR, "todos/", &mut errors);
    let (knowledge_files, knowledge_src) = scan_knowledge_files(planning, &target.subsystems);

    let aggregated = aggregate_from_summaries(&summaries);

    ScanReport {
        success: true,
        planning_found: true,
        target,
        sources: Sources {
            summaries: summaries_src,
            debug_docs: debug_src,
            adhoc_summaries: adhoc_src,
            completed_todos: completed_src,
            pending_todos: pending_src,
            knowledge_files: knowledge_src,
            parse_errors: errors,
        },
        summaries,
        debug_learnings,
        adhoc_learnings,
        completed_todos,
        pending_todos,
        knowledge_files,
        aggregated,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Matching files under `dir`, with the source record already filled in.
fn enumerate(dir: &Path, depth: Depth, suffix: &str, empty_reason: &str) -> (Vec<PathBuf>, SourceInfo) {
    let mut info = SourceInfo::new(dir);
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "source skipped: {DIR_NOT_FOUND}");
        info.skipped = Some(DIR_NOT_FOUND.to_string());
        return (Vec::new(), info);
    }
    let files = paths::list_files(dir, depth, suffix);
    if files.is_empty() {
        tracing::debug!(dir = %dir.display(), "source skipped: {empty_reason}");
        info.skipped = Some(empty_reason.to_string());
    }
    info.scanned = files.len();
    (files, info)
}

/// File text plus its frontmatter, or `None` after recording a parse error.
fn load(path: &Path, errors: &mut Vec<ParseError>) -> Option<(Frontmatter, String)> {
    let parsed = io::read_lossy(path)
        .ok()
        .and_then(|text| parse_frontmatter(&text).map(|fm| (fm, text)));
    if parsed.is_none() {
        tracing::debug!(path = %path.display(), "{NO_VALID_FRONTMATTER}");
        errors.push(ParseError {
            path: path.display().to_string(),
            error: NO_VALID_FRONTMATTER.to_string(),
        });
    }
    parsed
}

// ---------------------------------------------------------------------------
// Scanners
// ---------------------------------------------------------------------------

/// `phases/*/*-SUMMARY.md`, scored and upgraded through the requires chain.
pub fn scan_summaries(
    planning: &Path,
    target: &ScanTarget,
    errors: &mut Vec<ParseError>,
) -> (Vec<ScoredSummary>, SourceInfo) {
    let dir = paths::phases_dir(planning);
    let (files, info) = enumerate(
        &dir,
        Depth::Nested,
        paths::SUMMARY_SUFFIX,
        "no SUMMARY.md files found",
    );

    let mut results = Vec::new();
    for path in files {
        let Some((fm, text)) = load(&path, errors) else {
            continue;
        };
        let (relevance, match_reasons) = score_summary(&fm, target);
        results.push(ScoredSummary {
            path: path.display().to_string(),
            frontmatter: fm,
            relevance,
            match_reasons,
            has_readiness_warnings: has_readiness_section(&text),
        });
    }

    let chain = resolve_transitive_requires(&results, &target.phase);
    apply_transitive_upgrade(&mut results, &chain);
    (results, info)
}

/// `debug/resolved/*.md`. Not scored; every resolved doc is surfaced.
pub fn scan_debug_docs(
    planning: &Path,
    errors: &mut Vec<ParseError>,
) -> (Vec<DebugLearning>, SourceInfo) {
    let dir = planning.join(paths::DEBUG_RESOLVED_DIR);
    let (files, info) = enumerate(
        &dir,
        Depth::Flat,
        paths::MD_SUFFIX,
        "no .md files in debug/resolved/",
    );

    let results = files
        .iter()
        .filter_map(|path| {
            let (fm, _) = load(path, errors)?;
            Some(DebugLearning {
                path: path.display().to_string(),
                slug: paths::file_stem(path),
                subsystem: fm.rendered("subsystem"),
                root_cause: fm.rendered("root_cause"),
                resolution: fm.rendered("resolution"),
                tags: fm.list("tags"),
                phase: fm.rendered("phase"),
            })
        })
        .collect();
    (results, info)
}

/// `adhoc/**/*-SUMMARY.md`. Phase-style summaries without `learnings` fall
/// back to their `key-decisions`.
pub fn scan_adhoc_summaries(
    planning: &Path,
    errors: &mut Vec<ParseError>,
) -> (Vec<AdhocLearning>, SourceInfo) {
    let dir = planning.join(paths::ADHOC_DIR);
    let (files, info) = enumerate(
        &dir,
        Depth::Recursive,
        paths::SUMMARY_SUFFIX,
        "no adhoc SUMMARY.md files found",
    );

    let results = files
        .iter()
        .filter_map(|path| {
            let (fm, _) = load(path, errors)?;
            let mut learnings = fm.list("learnings");
            if learnings.is_empty() {
                learnings = fm.list("key-decisions");
            }
            Some(AdhocLearning {
                path: path.display().to_string(),
                subsystem: fm.rendered("subsystem"),
                learnings,
                related_phase: fm.rendered("related_phase"),
                tags: fm.list("tags"),
            })
        })
        .collect();
    (results, info)
}

/// `<subdir>/*.md` todos. `todos/` itself is not recursive, so `todos/done/`
/// never leaks into the pending list.
pub fn scan_todos(
    planning: &Path,
    subdir: &str,
    label: &str,
    errors: &mut Vec<ParseError>,
) -> (Vec<TodoItem>, SourceInfo) {
    let dir = planning.join(subdir);
    let (files, info) = enumerate(
        &dir,
        Depth::Flat,
        paths::MD_SUFFIX,
        &format!("no .md files in {label}"),
    );

    let results = files
        .iter()
        .filter_map(|path| {
            let (fm, _) = load(path, errors)?;
            let title = match fm.rendered("title") {
                t if t.is_empty() => paths::file_stem(path),
                t => t,
            };
            Some(TodoItem {
                path: path.display().to_string(),
                title,
                subsystem: fm.rendered("subsystem"),
                priority: fm.rendered("priority"),
                estimate: fm.rendered("estimate"),
            })
        })
        .collect();
    (results, info)
}

/// `knowledge/*.md`, matched to the target by file stem (case-insensitive).
pub fn scan_knowledge_files(
    planning: &Path,
    subsystems: &[String],
) -> (Vec<KnowledgeFile>, SourceInfo) {
    let dir = planning.join(paths::KNOWLEDGE_DIR);
    let (files, info) = enumerate(
        &dir,
        Depth::Flat,
        paths::MD_SUFFIX,
        "no .md files in knowledge/",
    );

    let wanted: HashSet<String> = subsystems.iter().map(|s| s.to_lowercase()).collect();
    let results = files
        .iter()
        .map(|path| {
            let subsystem = paths::file_stem(path);
            KnowledgeFile {
                path: path.display().to_string(),
                matched: wanted.contains(&subsystem.to_lowercase()),
                subsystem,
            }
        })
        .collect();
    (results, info)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relevance::Relevance;
    use crate::root::FixedRoot;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn target() -> ScanTarget {
        ScanTarget::new("5", "auth flow", &["auth".to_string()], "jwt")
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join(".planning");
        write(
            &p,
            "phases/04-api/04-01-SUMMARY.md",
            "---\nphase: 04-api\naffects: [05-auth]\nrequires: [02-db]\ntech-stack:\n  added: [jose]\nkey-decisions: [Use JWT]\n---\n\n## Next Phase Readiness\n\n- refresh tokens unresolved\n",
        );
        write(
            &p,
            "phases/02-db/02-01-SUMMARY.md",
            "---\nphase: 02-db\ntech-stack:\n  added: [sqlx]\n---\n",
        );
        write(
            &p,
            "phases/01-infra/01-01-SUMMARY.md",
            "---\nphase: 01-infra\ntech-stack:\n  added: [postgres]\n---\n",
        );
        write(&p, "phases/01-infra/01-02-SUMMARY.md", "no frontmatter here\n");
        write(
            &p,
            "debug/resolved/token-expiry.md",
            "---\nsubsystem: auth\nroot_cause: clock skew\nresolution: leeway\ntags: jwt\nphase: 04-api\n---\n",
        );
        write(
            &p,
            "adhoc/2026-01-fix/fix-SUMMARY.md",
            "---\nsubsystem: api\nkey-decisions: [Retry on 503]\n---\n",
        );
        write(&p, "todos/add-mfa.md", "---\ntitle: Add MFA\nsubsystem: auth\npriority: 1\nestimate: M\n---\n");
        write(&p, "todos/done/setup-ci.md", "---\nsubsystem: infra\n---\n");
        write(&p, "knowledge/Auth.md", "# Auth\n");
        write(&p, "knowledge/billing.md", "# Billing\n");
        dir
    }

    #[test]
    fn full_scan_collects_every_source() {
        let dir = corpus();
        let report = scan_planning_context(&FixedRoot(dir.path().to_path_buf()), target());
        assert!(report.planning_found);

        assert_eq!(report.sources.summaries.scanned, 4);
        assert_eq!(report.summaries.len(), 3);
        assert_eq!(report.sources.parse_errors.len(), 1);
        assert!(report.sources.parse_errors[0].path.ends_with("01-02-SUMMARY.md"));
        assert_eq!(report.sources.parse_errors[0].error, NO_VALID_FRONTMATTER);

        let by_phase = |phase: &str| {
            report
                .summaries
                .iter()
                .find(|s| s.phase_name() == phase)
                .unwrap()
        };
        assert_eq!(by_phase("04-api").relevance, Relevance::High);
        assert!(by_phase("04-api").has_readiness_warnings);
        assert_eq!(by_phase("02-db").relevance, Relevance::High);
        assert_eq!(
            by_phase("02-db").match_reasons.last().map(String::as_str),
            Some("in transitive requires chain")
        );
        assert_eq!(by_phase("01-infra").relevance, Relevance::Low);

        assert_eq!(report.aggregated.tech_stack_added, vec!["jose", "sqlx"]);
        assert_eq!(report.aggregated.key_decisions, vec!["Use JWT"]);

        assert_eq!(report.debug_learnings.len(), 1);
        assert_eq!(report.debug_learnings[0].slug, "token-expiry");
        assert_eq!(report.debug_learnings[0].tags, vec!["jwt"]);

        assert_eq!(report.adhoc_learnings.len(), 1);
        assert_eq!(report.adhoc_learnings[0].learnings, vec!["Retry on 503"]);

        assert_eq!(report.pending_todos.len(), 1);
        assert_eq!(report.pending_todos[0].title, "Add MFA");
        assert_eq!(report.pending_todos[0].priority, "1");
        assert_eq!(report.completed_todos.len(), 1);
        assert_eq!(report.completed_todos[0].title, "setup-ci");

        let matched: Vec<&str> = report
            .knowledge_files
            .iter()
            .filter(|k| k.matched)
            .map(|k| k.subsystem.as_str())
            .collect();
        assert_eq!(matched, vec!["Auth"]);
    }

    #[test]
    fn missing_directories_are_skipped_not_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".planning/todos")).unwrap();
        let report = scan_planning_dir(&dir.path().join(".planning"), target());

        assert_eq!(report.sources.summaries.skipped.as_deref(), Some(DIR_NOT_FOUND));
        assert_eq!(
            report.sources.pending_todos.skipped.as_deref(),
            Some("no .md files in todos/")
        );
        assert_eq!(report.sources.completed_todos.skipped.as_deref(), Some(DIR_NOT_FOUND));
        assert!(report.sources.parse_errors.is_empty());
    }

    #[test]
    fn adhoc_prefers_learnings_over_decisions() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "adhoc/a-SUMMARY.md",
            "---\nlearnings: Cache invalidation is hard\nkey-decisions: [ignored]\n---\n",
        );
        let mut errors = Vec::new();
        let (results, info) = scan_adhoc_summaries(dir.path(), &mut errors);
        assert_eq!(info.scanned, 1);
        assert_eq!(results[0].learnings, vec!["Cache invalidation is hard"]);
    }

    #[test]
    fn structured_values_are_rendered_not_dropped() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "debug/resolved/race.md",
            "---\nsubsystem: [auth, api]\nroot_cause:\n  - lock held across await\n  - retry storm\nresolution:\n  code: drop guard\n---\n",
        );
        write(dir.path(), "todos/tidy.md", "---\npriority: [1, 2]\nestimate: {low: S, high: M}\n---\n");

        let mut errors = Vec::new();
        let (debug, _) = scan_debug_docs(dir.path(), &mut errors);
        assert_eq!(debug[0].subsystem, r#"["auth","api"]"#);
        assert_eq!(debug[0].root_cause, r#"["lock held across await","retry storm"]"#);
        assert_eq!(debug[0].resolution, r#"{"code":"drop guard"}"#);

        let (todos, _) = scan_todos(dir.path(), paths::TODOS_DIR, "todos/", &mut errors);
        assert_eq!(todos[0].priority, "[1,2]");
        assert_eq!(todos[0].estimate, r#"{"high":"M","low":"S"}"#);
        assert!(errors.is_empty());
    }

    #[test]
    fn no_corpus_yields_empty_well_formed_report() {
        let dir = TempDir::new().unwrap();
        let report = scan_planning_context(&FixedRoot(dir.path().to_path_buf()), target());
        assert!(report.success);
        assert!(!report.planning_found);
        assert!(report.summaries.is_empty());
        assert!(report.knowledge_files.is_empty());
        for (_, info) in report.sources.named() {
            assert_eq!(info.skipped.as_deref(), Some(PLANNING_NOT_FOUND));
        }

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["target"]["phase"], "05");
        assert_eq!(json["aggregated"]["key_decisions"], serde_json::json!([]));
        assert!(json.get("planning_found").is_none());
    }
}
