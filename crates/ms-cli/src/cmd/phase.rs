use super::require_planning;
use crate::output::{print_json, print_lines};
use ms_core::artifact::{self, ArtifactKind};
use ms_core::root::{Planning, RootProvider};
use std::str::FromStr;

/// Always succeeds; a repository without `.planning/` reports no directory.
pub fn find(provider: &dyn RootProvider, phase: &str) -> anyhow::Result<()> {
    let planning = Planning::discover(provider);
    print_json(&artifact::find_phase(planning.as_ref(), phase))
}

pub fn list_artifacts(provider: &dyn RootProvider, phase: &str) -> anyhow::Result<()> {
    let planning = require_planning(provider)?;
    print_json(&artifact::list_artifacts(&planning, phase))
}

pub fn check_artifact(provider: &dyn RootProvider, phase: &str, kind: &str) -> anyhow::Result<()> {
    let kind = ArtifactKind::from_str(kind)?;
    let planning = require_planning(provider)?;
    print_json(&artifact::check_artifact(&planning, phase, kind))
}

pub fn list_phases(provider: &dyn RootProvider, from: u32, to: u32, json: bool) -> anyhow::Result<()> {
    let planning = require_planning(provider)?;
    let phases = artifact::phases_in_range(&planning, from, to)?;

    if json {
        return print_json(&phases);
    }
    print_lines(phases.iter().map(|entry| &entry.dir))
}
