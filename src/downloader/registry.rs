use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Output files already tagged during one strategy attempt of one job.
///
/// A fresh registry is created for every attempt, so bookkeeping left by an
/// abandoned attempt can never suppress tagging in a later one, and nothing
/// carries over between jobs.
#[derive(Debug, Default)]
pub struct JobIsolationRegistry {
    tagged: HashSet<PathBuf>,
}

impl JobIsolationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.tagged.contains(&Self::key(path))
    }

    /// Returns `false` if the path was already recorded.
    pub fn mark(&mut self, path: &Path) -> bool {
        self.tagged.insert(Self::key(path))
    }

    pub fn len(&self) -> usize {
        self.tagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tagged.is_empty()
    }

    fn key(path: &Path) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }
}
