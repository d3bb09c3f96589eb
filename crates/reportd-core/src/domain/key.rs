//! TaskKey - the artifact paths a task is responsible for.

use std::fmt;
use std::path::{Path, PathBuf};

use super::errors::KeyError;

/// Identifies a unit of work by the artifacts it must produce.
///
/// All paths are made absolute on construction. The first one is canonical:
/// the ledger and every status line use it. The task counts as done only when
/// every path exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    paths: Vec<PathBuf>,
}

impl TaskKey {
    pub fn new<I, P>(paths: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                std::path::absolute(path).map_err(|source| KeyError::Resolve {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if paths.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self { paths })
    }

    /// Key for a single artifact.
    pub fn single(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        Self::new([path])
    }

    pub fn canonical(&self) -> &Path {
        &self.paths[0]
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical().display())
    }
}
