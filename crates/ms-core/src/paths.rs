use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Directory constants (relative to the repository root)
// ---------------------------------------------------------------------------

pub const PLANNING_DIR: &str = ".planning";

// ---------------------------------------------------------------------------
// Directory constants (relative to `.planning/`)
// ---------------------------------------------------------------------------

pub const PHASES_DIR: &str = "phases";
pub const DEBUG_DIR: &str = "debug";
pub const DEBUG_RESOLVED_DIR: &str = "debug/resolved";
pub const ADHOC_DIR: &str = "adhoc";
pub const TODOS_DIR: &str = "todos";
pub const TODOS_DONE_DIR: &str = "todos/done";
pub const KNOWLEDGE_DIR: &str = "knowledge";

pub const CONFIG_FILE: &str = "config.json";
pub const ROADMAP_FILE: &str = "ROADMAP.md";

pub const SUMMARY_SUFFIX: &str = "-SUMMARY.md";
pub const UAT_SUFFIX: &str = "-UAT.md";
pub const MD_SUFFIX: &str = ".md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn planning_dir(root: &Path) -> PathBuf {
    root.join(PLANNING_DIR)
}

pub fn phases_dir(planning: &Path) -> PathBuf {
    planning.join(PHASES_DIR)
}

pub fn config_path(planning: &Path) -> PathBuf {
    planning.join(CONFIG_FILE)
}

pub fn roadmap_path(planning: &Path) -> PathBuf {
    planning.join(ROADMAP_FILE)
}

/// `<phase_dir>/<dir-name>-UAT.md`
pub fn uat_path(phase_dir: &Path) -> PathBuf {
    phase_dir.join(format!("{}{UAT_SUFFIX}", dir_name(phase_dir)))
}

pub fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File stem without the `.md` extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First directory under `phases/` (sorted by name) called `<phase>` or
/// starting with `<phase>-`.
pub fn find_phase_dir(planning: &Path, phase: &str) -> Option<PathBuf> {
    let prefix = format!("{phase}-");
    list_phase_dirs(planning)
        .into_iter()
        .find(|d| {
            let name = dir_name(d);
            name == phase || name.starts_with(&prefix)
        })
}

/// All non-hidden directories directly under `phases/`, sorted by name.
pub fn list_phase_dirs(planning: &Path) -> Vec<PathBuf> {
    let dir = phases_dir(planning);
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut dirs: Vec<PathBuf> = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && !is_hidden(e.file_name()))
        .map(|e| e.into_path())
        .collect();
    dirs.sort();
    dirs
}

// ---------------------------------------------------------------------------
// File listing
// ---------------------------------------------------------------------------

/// How far below the scanned directory matching files may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// `dir/*<suffix>`
    Flat,
    /// `dir/*/*<suffix>`
    Nested,
    /// `dir/**/*<suffix>`
    Recursive,
}

/// List files under `dir` whose name ends with `suffix`, sorted by path.
///
/// Hidden files and directories (leading `.`) are skipped, matching shell glob
/// semantics. Unreadable entries are skipped rather than reported.
pub fn list_files(dir: &Path, depth: Depth, suffix: &str) -> Vec<PathBuf> {
    let (min, max) = match depth {
        Depth::Flat => (1, 1),
        Depth::Nested => (2, 2),
        Depth::Recursive => (1, usize::MAX),
    };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(min)
        .max_depth(max)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn path_helpers() {
        let planning = Path::new("/tmp/proj/.planning");
        assert_eq!(
            config_path(planning),
            PathBuf::from("/tmp/proj/.planning/config.json")
        );
        assert_eq!(
            uat_path(Path::new("/tmp/proj/.planning/phases/05-auth")),
            PathBuf::from("/tmp/proj/.planning/phases/05-auth/05-auth-UAT.md")
        );
    }

    #[test]
    fn find_phase_dir_matches_prefix_and_exact_name() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("phases/05-auth")).unwrap();
        std::fs::create_dir_all(dir.path().join("phases/99")).unwrap();
        std::fs::create_dir_all(dir.path().join("phases/050-other")).unwrap();

        let found = find_phase_dir(dir.path(), "05").unwrap();
        assert_eq!(dir_name(&found), "05-auth");
        let exact = find_phase_dir(dir.path(), "99").unwrap();
        assert_eq!(dir_name(&exact), "99");
        assert!(find_phase_dir(dir.path(), "07").is_none());
    }

    #[test]
    fn list_files_respects_depth() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a-SUMMARY.md"));
        touch(&dir.path().join("sub/b-SUMMARY.md"));
        touch(&dir.path().join("sub/deeper/c-SUMMARY.md"));
        touch(&dir.path().join("sub/notes.md"));

        let flat = list_files(dir.path(), Depth::Flat, SUMMARY_SUFFIX);
        assert_eq!(flat.len(), 1);
        let nested = list_files(dir.path(), Depth::Nested, SUMMARY_SUFFIX);
        assert_eq!(nested.len(), 1);
        assert!(nested[0].ends_with("sub/b-SUMMARY.md"));
        let all = list_files(dir.path(), Depth::Recursive, SUMMARY_SUFFIX);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn list_files_skips_hidden_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.md"));
        touch(&dir.path().join("a.md"));
        touch(&dir.path().join(".hidden.md"));
        touch(&dir.path().join(".git/x.md"));

        let files = list_files(dir.path(), Depth::Recursive, MD_SUFFIX);
        let names: Vec<String> = files.iter().map(|p| file_stem(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
