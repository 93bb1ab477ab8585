use ms_core::paths::PLANNING_DIR;
use ms_core::root::RootProvider;
use std::path::{Path, PathBuf};

/// Resolve the repository root.
///
/// Priority:
/// 1. `--root` flag / `MS_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.planning/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    find_upward(cwd, PLANNING_DIR)
        .or_else(|| find_upward(cwd, ".git"))
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

/// Root provider used by every command.
pub struct WalkUpRoot {
    explicit: Option<PathBuf>,
    cwd: PathBuf,
}

impl WalkUpRoot {
    pub fn new(explicit: Option<&Path>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_cwd(explicit, cwd)
    }

    pub fn with_cwd(explicit: Option<&Path>, cwd: PathBuf) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
            cwd,
        }
    }
}

impl RootProvider for WalkUpRoot {
    fn repo_root(&self) -> Option<PathBuf> {
        Some(resolve_root(self.explicit.as_deref(), &self.cwd))
    }
}
