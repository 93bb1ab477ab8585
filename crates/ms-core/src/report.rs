//! Markdown rendering of a [`ScanReport`] for prompt assembly.

use crate::paths;
use crate::relevance::Relevance;
use crate::scan::ScanReport;
use std::path::Path;

pub const NO_CORPUS_MESSAGE: &str =
    "No .planning/ directory found. No prior context available.";

/// Headed sections joined by blank lines. Empty sections are omitted; the
/// scanner info section is always last.
pub fn render_markdown(report: &ScanReport) -> String {
    if !report.planning_found {
        return NO_CORPUS_MESSAGE.to_string();
    }

    let mut sections: Vec<String> = Vec::new();
    let agg = &report.aggregated;

    if !agg.patterns_established.is_empty() {
        sections.push(bullets("### Established Patterns", &agg.patterns_established, |p| {
            format!("- {p}")
        }));
    }

    if !agg.tech_stack_added.is_empty() {
        sections.push(format!("### Tech Stack\n{}", agg.tech_stack_added.join(", ")));
    }

    if !agg.key_decisions.is_empty() {
        sections.push(bullets("### Key Decisions", &agg.key_decisions, |d| format!("- {d}")));
    }

    if !agg.key_files_created.is_empty() || !agg.key_files_modified.is_empty() {
        let mut lines = vec!["### Key Files".to_string()];
        if !agg.key_files_created.is_empty() {
            lines.push("**Created:**".to_string());
            lines.extend(agg.key_files_created.iter().map(|f| format!("- `{f}`")));
        }
        if !agg.key_files_modified.is_empty() {
            lines.push("**Modified:**".to_string());
            lines.extend(agg.key_files_modified.iter().map(|f| format!("- `{f}`")));
        }
        sections.push(lines.join("\n"));
    }

    if !report.debug_learnings.is_empty() {
        sections.push(bullets("### Debug Learnings", &report.debug_learnings, |d| {
            format!(
                "- **{}** ({}): {} — Fix: {}",
                d.slug, d.subsystem, d.root_cause, d.resolution
            )
        }));
    }

    let adhoc: Vec<_> = report
        .adhoc_learnings
        .iter()
        .filter(|a| !a.learnings.is_empty())
        .collect();
    if !adhoc.is_empty() {
        let mut lines = vec!["### Adhoc Learnings".to_string()];
        for entry in adhoc {
            let label = if !entry.subsystem.is_empty() {
                entry.subsystem.clone()
            } else if !entry.path.is_empty() {
                paths::file_stem(Path::new(&entry.path))
            } else {
                "unknown".to_string()
            };
            lines.push(format!("- **{label}**"));
            lines.extend(entry.learnings.iter().map(|l| format!("  - {l}")));
        }
        sections.push(lines.join("\n"));
    }

    let needs_read: Vec<_> = report
        .summaries
        .iter()
        .filter(|s| s.relevance == Relevance::High && s.has_readiness_warnings)
        .collect();
    let other_relevant: Vec<_> = report
        .summaries
        .iter()
        .filter(|s| s.relevance.is_relevant() && !s.has_readiness_warnings)
        .collect();

    if !needs_read.is_empty() {
        sections.push(bullets("### Summaries Needing Full Read", &needs_read, |s| {
            format!("- `{}`", s.path)
        }));
    }
    if !other_relevant.is_empty() {
        sections.push(bullets("### Other Relevant Summaries", &other_relevant, |s| {
            format!("- `{}` [{}]", s.path, s.relevance)
        }));
    }

    let knowledge: Vec<_> = report.knowledge_files.iter().filter(|k| k.matched).collect();
    if !knowledge.is_empty() {
        sections.push(bullets("### Knowledge Files to Read", &knowledge, |k| {
            format!("- `{}`", k.path)
        }));
    }

    if !report.pending_todos.is_empty() {
        sections.push(bullets("### Pending Todos", &report.pending_todos, |t| {
            format!(
                "- **{}** [P{}|{}] ({}) — `{}`",
                t.title, t.priority, t.estimate, t.subsystem, t.path
            )
        }));
    }

    let mut info = vec!["### Scanner Info".to_string()];
    for (name, src) in report.sources.named() {
        match &src.skipped {
            Some(reason) => info.push(format!("- {name}: skipped ({reason})")),
            None => info.push(format!("- {name}: {} scanned", src.scanned)),
        }
    }
    if !report.sources.parse_errors.is_empty() {
        info.push("**Parse errors:**".to_string());
        info.extend(
            report
                .sources
                .parse_errors
                .iter()
                .map(|e| format!("- `{}`: {}", e.path, e.error)),
        );
    }
    sections.push(info.join("\n"));

    sections.join("\n\n")
}

fn bullets<T>(heading: &str, items: &[T], line: impl Fn(&T) -> String) -> String {
    let mut lines = vec![heading.to_string()];
    lines.extend(items.iter().map(line));
    lines.join("\n")
}
