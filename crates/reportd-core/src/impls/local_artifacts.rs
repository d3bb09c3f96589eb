//! LocalArtifactStore - artifacts on the local filesystem.

use std::path::Path;

use crate::ports::ArtifactStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArtifactStore;

impl LocalArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn exists(&self, path: &Path) -> bool {
        // dangling symlink は存在しない扱い
        path.exists()
    }
}
