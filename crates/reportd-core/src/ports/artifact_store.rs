//! ArtifactStore port - artifact の存在確認
//!
//! Existence is the ground truth for "work already done". Results are never
//! cached: every decision asks again.

use std::path::{Path, PathBuf};

use crate::domain::TaskKey;

pub trait ArtifactStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Paths of `key` that do not exist right now, in key order.
    fn missing(&self, key: &TaskKey) -> Vec<PathBuf> {
        key.paths()
            .iter()
            .filter(|path| !self.exists(path))
            .cloned()
            .collect()
    }
}
