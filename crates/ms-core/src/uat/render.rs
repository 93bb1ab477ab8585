//! Canonical UAT layout.

use super::grammar::Section;
use super::{ensure_quoted, recalc_progress, FieldMap, UatFile};
use crate::error::Result;

pub(crate) const CURRENT_BATCH_FIELDS: &[&str] = &["batch", "name", "mock_type", "tests", "status"];
pub(crate) const TEST_FIELDS: &[&str] = &[
    "expected",
    "mock_required",
    "mock_type",
    "result",
    "reported",
    "severity",
    "fix_status",
    "fix_commit",
    "retry_count",
    "reason",
];
pub(crate) const FIX_FIELDS: &[&str] = &["commit", "test", "description", "files"];
pub(crate) const BATCH_FIELDS: &[&str] = &["tests", "status", "mock_type", "passed", "issues"];
pub(crate) const ASSUMPTION_FIELDS: &[&str] = &["test", "name", "expected", "reason"];

pub(crate) const TEST_QUOTED: &[&str] = &["reported"];
pub(crate) const FIX_QUOTED: &[&str] = &["description"];
pub(crate) const ASSUMPTION_QUOTED: &[&str] = &["name", "expected", "reason"];

/// Canonical fields in `order` first, then any others in first-seen order.
fn ordered<'a>(fields: &'a FieldMap, order: &[&str]) -> Vec<(&'a str, &'a str)> {
    let canonical = order
        .iter()
        .filter_map(|k| fields.iter().find(|(key, _)| key == k));
    let extras = fields.iter().filter(|(k, _)| !order.contains(k));
    canonical.chain(extras).collect()
}

fn value_for(key: &str, value: &str, quoted: &[&str]) -> String {
    if quoted.contains(&key) {
        ensure_quoted(value)
    } else {
        value.to_string()
    }
}

fn push_block(lines: &mut Vec<String>, fields: &FieldMap, order: &[&str], quoted: &[&str]) {
    for (k, v) in ordered(fields, order) {
        lines.push(format!("{k}: {}", value_for(k, v, quoted)));
    }
}

fn push_items(lines: &mut Vec<String>, items: &[FieldMap], order: &[&str], quoted: &[&str]) {
    for item in items {
        for (i, (k, v)) in ordered(item, order).into_iter().enumerate() {
            let prefix = if i == 0 { "- " } else { "  " };
            lines.push(format!("{prefix}{k}: {}", value_for(k, v, quoted)));
        }
        lines.push(String::new());
    }
}

fn heading(lines: &mut Vec<String>, title: &str) {
    lines.push(format!("## {title}"));
    lines.push(String::new());
}

pub(crate) fn render(uat: &UatFile) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();

    lines.push("---".to_string());
    lines.push(serde_yaml::to_string(&uat.frontmatter)?.trim_end().to_string());
    lines.push("---".to_string());
    lines.push(String::new());

    if !uat.preamble.is_empty() {
        lines.extend(uat.preamble.iter().cloned());
        lines.push(String::new());
    }

    heading(&mut lines, Section::Progress.title());
    let p = recalc_progress(&uat.tests);
    for (k, v) in [
        ("total", p.total),
        ("tested", p.tested),
        ("passed", p.passed),
        ("issues", p.issues),
        ("fixing", p.fixing),
        ("pending", p.pending),
        ("skipped", p.skipped),
    ] {
        lines.push(format!("{k}: {v}"));
    }
    lines.push(String::new());

    heading(&mut lines, Section::CurrentBatch.title());
    push_block(&mut lines, &uat.current_batch, CURRENT_BATCH_FIELDS, &[]);
    lines.push(String::new());

    heading(&mut lines, Section::Tests.title());
    for t in &uat.tests {
        lines.push(format!("### {}. {}", t.num, t.name));
        push_block(&mut lines, &t.fields, TEST_FIELDS, TEST_QUOTED);
        lines.push(String::new());
    }

    heading(&mut lines, Section::FixesApplied.title());
    push_items(&mut lines, &uat.fixes, FIX_FIELDS, FIX_QUOTED);

    heading(&mut lines, Section::Batches.title());
    for b in &uat.batches {
        lines.push(format!("### Batch {}: {}", b.num, b.name));
        push_block(&mut lines, &b.fields, BATCH_FIELDS, &[]);
        lines.push(String::new());
    }

    heading(&mut lines, Section::Assumptions.title());
    push_items(&mut lines, &uat.assumptions, ASSUMPTION_FIELDS, ASSUMPTION_QUOTED);

    for (name, body) in &uat.extra_sections {
        heading(&mut lines, name);
        if !body.is_empty() {
            lines.extend(body.iter().cloned());
            lines.push(String::new());
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ordered_puts_extras_last() {
        let map = fields(&[("note", "x"), ("status", "pending"), ("tests", "[1]")]);
        let got = ordered(&map, BATCH_FIELDS);
        assert_eq!(got, vec![("tests", "[1]"), ("status", "pending"), ("note", "x")]);
    }

    #[test]
    fn list_items_prefix_first_field_only() {
        let mut lines = Vec::new();
        let fix = fields(&[("files", "[a]"), ("commit", "abc"), ("description", "Fixed")]);
        push_items(&mut lines, &[fix], FIX_FIELDS, FIX_QUOTED);
        assert_eq!(
            lines,
            vec!["- commit: abc", "  description: \"Fixed\"", "  files: [a]", ""]
        );
    }

    #[test]
    fn empty_document_layout() {
        let text = render(&UatFile::default()).unwrap();
        let expected = "---\n{}\n---\n\n## Progress\n\ntotal: 0\ntested: 0\npassed: 0\nissues: 0\nfixing: 0\npending: 0\nskipped: 0\n\n## Current Batch\n\n\n## Tests\n\n## Fixes Applied\n\n## Batches\n\n## Assumptions\n";
        assert_eq!(text, expected);
    }
}
