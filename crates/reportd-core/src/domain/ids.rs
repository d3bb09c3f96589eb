//! Attempt identifiers.
//!
//! Every submission of a key gets a fresh ULID so that log lines of a retry can
//! be told apart from the attempt it replaces. ULID は時刻でソート可能。

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of one attempt to produce the artifacts of a key.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(Ulid);

impl AttemptId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl From<Ulid> for AttemptId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = AttemptId::generate();
        let b = AttemptId::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("attempt-"));
    }

    #[test]
    fn ids_are_sortable_by_creation_time() {
        let first = AttemptId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = AttemptId::generate();
        assert!(first < second);
    }
}
