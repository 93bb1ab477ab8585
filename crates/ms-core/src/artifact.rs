//! Phase-directory lookups: locating a phase, counting its artifacts, and
//! auditing `subsystem:` values across the corpus.

use crate::config::PlanningConfig;
use crate::error::{MsError, Result};
use crate::frontmatter::load_frontmatter;
use crate::io;
use crate::paths::{self, Depth};
use crate::phase::{in_range, normalize_phase};
use crate::root::Planning;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// find-phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseLocation {
    pub phase: String,
    /// Relative to the repository root.
    pub dir: Option<String>,
    /// Directory name after the first `-`, or the whole name when there is none.
    pub name: Option<String>,
    pub exists_in_roadmap: bool,
}

/// Locate `phase` on disk and in `ROADMAP.md`. A missing corpus is not an error.
pub fn find_phase(planning: Option<&Planning>, phase: &str) -> PhaseLocation {
    let phase = normalize_phase(phase);
    let mut location = PhaseLocation {
        phase: phase.clone(),
        dir: None,
        name: None,
        exists_in_roadmap: false,
    };
    let Some(planning) = planning else {
        return location;
    };

    if let Some(dir) = paths::find_phase_dir(planning.dir(), &phase) {
        let dir_name = paths::dir_name(&dir);
        location.name = Some(match dir_name.split_once('-') {
            Some((_, rest)) => rest.to_string(),
            None => dir_name,
        });
        location.dir = Some(planning.relative(&dir).display().to_string());
    }

    let roadmap = paths::roadmap_path(planning.dir());
    if roadmap.is_file() {
        match io::read_lossy(&roadmap) {
            Ok(text) => location.exists_in_roadmap = roadmap_mentions(&text, &phase),
            Err(e) => tracing::warn!(error = %e, "could not read ROADMAP.md"),
        }
    }
    location
}

/// `Phase <phase>` followed by whitespace or `:`.
fn roadmap_mentions(text: &str, phase: &str) -> bool {
    Regex::new(&format!(r"Phase\s+{}[\s:]", regex::escape(phase)))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Context,
    Design,
    Research,
    Uat,
    Verification,
    Plan,
    Summary,
    ExecutionOrder,
}

pub const EXECUTION_ORDER_FILE: &str = "EXECUTION-ORDER.md";

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::Context,
        ArtifactKind::Design,
        ArtifactKind::Research,
        ArtifactKind::Uat,
        ArtifactKind::Verification,
        ArtifactKind::Plan,
        ArtifactKind::Summary,
        ArtifactKind::ExecutionOrder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Context => "CONTEXT",
            ArtifactKind::Design => "DESIGN",
            ArtifactKind::Research => "RESEARCH",
            ArtifactKind::Uat => "UAT",
            ArtifactKind::Verification => "VERIFICATION",
            ArtifactKind::Plan => "PLAN",
            ArtifactKind::Summary => "SUMMARY",
            ArtifactKind::ExecutionOrder => "EXECUTION-ORDER",
        }
    }

    /// Files of this kind directly inside `phase_dir`, sorted.
    pub fn files_in(self, phase_dir: &Path) -> Vec<PathBuf> {
        match self {
            ArtifactKind::ExecutionOrder => {
                let path = phase_dir.join(EXECUTION_ORDER_FILE);
                if path.is_file() {
                    vec![path]
                } else {
                    Vec::new()
                }
            }
            kind => paths::list_files(phase_dir, Depth::Flat, &format!("-{}.md", kind.as_str())),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = MsError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        ArtifactKind::ALL
            .into_iter()
            .find(|k| k.as_str() == upper)
            .ok_or_else(|| MsError::InvalidArtifactType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// list-artifacts / check-artifact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactListing {
    pub phase: String,
    pub plans: usize,
    pub summaries: usize,
    pub has_context: bool,
    pub has_design: bool,
    pub has_research: bool,
    pub has_uat: bool,
    pub has_verification: bool,
    pub has_execution_order: bool,
}

/// Artifact counts for `phase`. A phase with no directory reports zeros.
pub fn list_artifacts(planning: &Planning, phase: &str) -> ArtifactListing {
    let phase = normalize_phase(phase);
    let Some(dir) = paths::find_phase_dir(planning.dir(), &phase) else {
        return ArtifactListing {
            phase,
            ..Default::default()
        };
    };
    let has = |kind: ArtifactKind| !kind.files_in(&dir).is_empty();
    ArtifactListing {
        plans: ArtifactKind::Plan.files_in(&dir).len(),
        summaries: ArtifactKind::Summary.files_in(&dir).len(),
        has_context: has(ArtifactKind::Context),
        has_design: has(ArtifactKind::Design),
        has_research: has(ArtifactKind::Research),
        has_uat: has(ArtifactKind::Uat),
        has_verification: has(ArtifactKind::Verification),
        has_execution_order: has(ArtifactKind::ExecutionOrder),
        phase,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCheck {
    pub exists: bool,
    /// First match, relative to the repository root.
    pub path: Option<String>,
}

pub fn check_artifact(planning: &Planning, phase: &str, kind: ArtifactKind) -> ArtifactCheck {
    let phase = normalize_phase(phase);
    let first = paths::find_phase_dir(planning.dir(), &phase)
        .and_then(|dir| kind.files_in(&dir).into_iter().next());
    ArtifactCheck {
        exists: first.is_some(),
        path: first.map(|p| planning.relative(&p).display().to_string()),
    }
}

// ---------------------------------------------------------------------------
// list-phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseEntry {
    /// Text before the first `-` of the directory name, e.g. `"02.1"`.
    pub phase: String,
    pub dir: String,
}

/// Phase directories whose numeric prefix lies in `start..=end` (decimal
/// phases like `05.2` count as part of phase 5).
pub fn phases_in_range(planning: &Planning, start: u32, end: u32) -> Result<Vec<PhaseEntry>> {
    if start > end {
        return Err(MsError::InvalidRange { start, end });
    }
    Ok(paths::list_phase_dirs(planning.dir())
        .into_iter()
        .filter_map(|dir| {
            let name = paths::dir_name(&dir);
            let prefix = name.split('-').next().unwrap_or_default().to_string();
            in_range(&prefix, start, end).then(|| PhaseEntry {
                phase: prefix,
                dir: planning.relative(&dir).display().to_string(),
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// subsystems
// ---------------------------------------------------------------------------

/// Artifact groups audited for `subsystem:` values, in report order.
const SUBSYSTEM_SOURCES: [(&str, &str, Depth, &str); 6] = [
    ("Phase SUMMARYs", paths::PHASES_DIR, Depth::Nested, paths::SUMMARY_SUFFIX),
    ("Adhoc SUMMARYs", paths::ADHOC_DIR, Depth::Flat, paths::SUMMARY_SUFFIX),
    ("Debug docs", paths::DEBUG_DIR, Depth::Flat, paths::MD_SUFFIX),
    ("Debug resolved", paths::DEBUG_RESOLVED_DIR, Depth::Flat, paths::MD_SUFFIX),
    ("Pending Todos", paths::TODOS_DIR, Depth::Flat, paths::MD_SUFFIX),
    ("Done Todos", paths::TODOS_DONE_DIR, Depth::Flat, paths::MD_SUFFIX),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemUse {
    pub path: String,
    pub subsystem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemGroup {
    pub header: String,
    pub entries: Vec<SubsystemUse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemAudit {
    pub groups: Vec<SubsystemGroup>,
    /// Configured vocabulary from `config.json`.
    pub vocabulary: Vec<String>,
    /// Distinct values in use that the vocabulary does not list. Empty when no
    /// vocabulary is configured.
    pub unknown: Vec<String>,
}

impl SubsystemAudit {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter().map(|e| e.subsystem.as_str()))
    }
}

pub fn audit_subsystems(planning: &Planning) -> SubsystemAudit {
    let config = PlanningConfig::load_or_default(planning.dir());

    let groups: Vec<SubsystemGroup> = SUBSYSTEM_SOURCES
        .iter()
        .map(|(header, subdir, depth, suffix)| {
            let dir = planning.dir().join(subdir);
            let entries = paths::list_files(&dir, *depth, suffix)
                .into_iter()
                .filter_map(|path| {
                    let subsystem = load_frontmatter(&path)?.text("subsystem");
                    (!subsystem.is_empty()).then(|| SubsystemUse {
                        path: planning.relative(&path).display().to_string(),
                        subsystem,
                    })
                })
                .collect();
            SubsystemGroup {
                header: header.to_string(),
                entries,
            }
        })
        .collect();

    let mut audit = SubsystemAudit {
        groups,
        vocabulary: config.subsystems.clone(),
        unknown: Vec::new(),
    };
    if !config.subsystems.is_empty() {
        let unknown: Vec<String> = audit
            .values()
            .filter(|v| !config.knows_subsystem(v))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();
        audit.unknown = unknown;
    }
    audit
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
