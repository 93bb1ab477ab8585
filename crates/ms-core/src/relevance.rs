//! Relevance scoring of phase summaries against a target phase.

use crate::frontmatter::{scalar_text, value_text, Frontmatter};
use crate::phase::{extract_phase_number, is_adjacent_phase, PhaseId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

static NAME_SPLIT_RE: OnceLock<Regex> = OnceLock::new();

fn name_split_re() -> &'static Regex {
    NAME_SPLIT_RE.get_or_init(|| Regex::new(r"[-_\s]+").unwrap())
}

pub const TRANSITIVE_REASON: &str = "in transitive requires chain";

// ---------------------------------------------------------------------------
// Relevance
// ---------------------------------------------------------------------------

/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relevance {
    Low,
    Medium,
    High,
}

impl Relevance {
    pub fn as_str(self) -> &'static str {
        match self {
            Relevance::Low => "LOW",
            Relevance::Medium => "MEDIUM",
            Relevance::High => "HIGH",
        }
    }

    pub fn is_relevant(self) -> bool {
        self != Relevance::Low
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ScanTarget
// ---------------------------------------------------------------------------

/// What the scan is looking for.
#[derive(Debug, Clone, Serialize)]
pub struct ScanTarget {
    pub phase: String,
    pub phase_name: String,
    pub subsystems: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(skip)]
    pub ordinal: Option<u32>,
}

impl ScanTarget {
    /// `keywords_csv` is split on commas; words longer than two characters
    /// from `phase_name` are appended as extra keywords.
    pub fn new(phase: &str, phase_name: &str, subsystems: &[String], keywords_csv: &str) -> Self {
        let phase = PhaseId::parse(phase);
        let phase_name = phase_name.trim().to_string();
        let subsystems = subsystems
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        let mut keywords: Vec<String> = keywords_csv
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        if !phase_name.is_empty() {
            keywords.extend(
                name_split_re()
                    .split(&phase_name)
                    .filter(|w| w.chars().count() > 2)
                    .map(String::from),
            );
        }
        Self {
            ordinal: phase.ordinal(),
            phase: phase.as_str().to_string(),
            phase_name,
            subsystems,
            keywords,
        }
    }
}

// ---------------------------------------------------------------------------
// ScoredSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ScoredSummary {
    pub path: String,
    pub frontmatter: Frontmatter,
    pub relevance: Relevance,
    pub match_reasons: Vec<String>,
    pub has_readiness_warnings: bool,
}

impl ScoredSummary {
    /// The summary's own `phase` field, e.g. `"05-auth"`.
    pub fn phase_name(&self) -> String {
        self.frontmatter.text("phase")
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Phase named by one `requires` entry: a bare identifier or a `{phase: ...}` record.
fn requirement_phase(entry: &Value) -> String {
    match entry {
        Value::Mapping(m) => m.get("phase").map(value_text).unwrap_or_default(),
        other => scalar_text(other).unwrap_or_default(),
    }
}

/// Phases listed under `requires`.
pub fn required_phases(fm: &Frontmatter) -> Vec<String> {
    fm.items("requires").into_iter().map(requirement_phase).collect()
}

/// Score one summary. Every signal that fires adds a reason; any HIGH signal
/// makes the verdict HIGH even when MEDIUM signals also fired.
pub fn score_summary(fm: &Frontmatter, target: &ScanTarget) -> (Relevance, Vec<String>) {
    let phase = target.phase.as_str();
    let mut reasons = Vec::new();
    let mut high = false;
    let mut medium = false;

    for affected in fm.list("affects") {
        if affected.contains(phase) {
            reasons.push(format!("affects contains '{phase}'"));
            high = true;
        }
    }

    let subsystem = fm.text("subsystem");
    if !subsystem.is_empty() && target.subsystems.contains(&subsystem) {
        reasons.push(format!("same subsystem '{subsystem}'"));
        high = true;
    }

    for required in required_phases(fm) {
        if required.contains(phase) {
            reasons.push(format!("requires references '{phase}'"));
            high = true;
        }
    }

    let tags: BTreeSet<String> = fm.list("tags").iter().map(|t| t.to_lowercase()).collect();
    let keywords: BTreeSet<String> = target.keywords.iter().map(|k| k.to_lowercase()).collect();
    let overlap: Vec<String> = tags
        .intersection(&keywords)
        .map(|t| format!("'{t}'"))
        .collect();
    if !overlap.is_empty() {
        reasons.push(format!("overlapping tags: [{}]", overlap.join(", ")));
        medium = true;
    }

    if let (Some(target_num), Some(candidate)) =
        (target.ordinal, extract_phase_number(&fm.text("phase")))
    {
        if is_adjacent_phase(target_num, candidate) {
            reasons.push(format!("adjacent phase (N-{})", target_num - candidate));
            medium = true;
        }
    }

    let relevance = if high {
        Relevance::High
    } else if medium {
        Relevance::Medium
    } else {
        Relevance::Low
    };
    (relevance, reasons)
}

// ---------------------------------------------------------------------------
// Transitive requirements
// ---------------------------------------------------------------------------

/// Phases that affect `target_phase`, plus the phases those summaries
/// require. Exactly one hop: requirements of the required phases are not
/// followed.
pub fn resolve_transitive_requires(
    summaries: &[ScoredSummary],
    target_phase: &str,
) -> BTreeSet<String> {
    let mut chain = BTreeSet::new();
    for summary in summaries {
        let fm = &summary.frontmatter;
        if !fm.list("affects").iter().any(|a| a.contains(target_phase)) {
            continue;
        }
        let own = summary.phase_name();
        if !own.is_empty() {
            chain.insert(own);
        }
        chain.extend(required_phases(fm).into_iter().filter(|p| !p.is_empty()));
    }
    chain
}

/// Raise every summary whose phase is in `chain` to HIGH. Never lowers a tier.
pub fn apply_transitive_upgrade(summaries: &mut [ScoredSummary], chain: &BTreeSet<String>) {
    for summary in summaries.iter_mut() {
        if summary.relevance != Relevance::High && chain.contains(&summary.phase_name()) {
            summary.relevance = Relevance::High;
            summary.match_reasons.push(TRANSITIVE_REASON.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
