//! Repository-root injection.
//!
//! The core never discovers the repository on its own: callers hand it a
//! `RootProvider` and everything below works on already-resolved paths.

use crate::paths;
use std::path::{Path, PathBuf};

/// Supplies the repository root the core operates on.
pub trait RootProvider {
    fn repo_root(&self) -> Option<PathBuf>;
}

/// A root that is already known.
#[derive(Debug, Clone)]
pub struct FixedRoot(pub PathBuf);

impl RootProvider for FixedRoot {
    fn repo_root(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// A located `.planning/` corpus.
#[derive(Debug, Clone)]
pub struct Planning {
    root: PathBuf,
    dir: PathBuf,
}

impl Planning {
    /// Returns `None` when there is no root or the root has no `.planning/` directory.
    pub fn discover(provider: &dyn RootProvider) -> Option<Self> {
        let root = provider.repo_root()?;
        let dir = paths::planning_dir(&root);
        dir.is_dir().then_some(Self { root, dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `path` relative to the repository root, or unchanged if it lies outside it.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
