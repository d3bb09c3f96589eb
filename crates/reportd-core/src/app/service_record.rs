//! ServiceRecord - the daemon's persisted identity.
//!
//! File format (`{workdir}/{service}.pid`, mode 0644):
//! ```text
//! 12345        <- pid
//! 12345        <- process group id (optional)
//! ```

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::domain::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRecord {
    pub pid: i32,
    pub pgid: Option<i32>,
}

impl ServiceRecord {
    pub fn path(workdir: &Path, service_name: &str) -> PathBuf {
        workdir.join(format!("{service_name}.pid"))
    }

    /// Identity of the calling process.
    pub fn current() -> Self {
        Self {
            pid: nix::unistd::getpid().as_raw(),
            pgid: Some(nix::unistd::getpgrp().as_raw()),
        }
    }

    /// `Ok(None)` when the file is absent or does not start with a pid.
    pub fn load(path: &Path) -> Result<Option<Self>, ServiceError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let record = Self::parse(&contents);
                if record.is_none() {
                    tracing::warn!(path = %path.display(), "unreadable service record ignored");
                }
                Ok(record)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ServiceError::Record {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn parse(contents: &str) -> Option<Self> {
        let mut lines = contents.lines().map(str::trim);
        let pid = lines.next()?.parse::<i32>().ok().filter(|pid| *pid > 0)?;
        let pgid = lines
            .next()
            .and_then(|line| line.parse::<i32>().ok())
            .filter(|pgid| *pgid > 0);
        Some(Self { pid, pgid })
    }

    pub fn store(&self, path: &Path) -> Result<(), ServiceError> {
        let to_record_error = |source| ServiceError::Record {
            path: path.to_path_buf(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)
            .map_err(to_record_error)?;
        // umask や既存ファイルの mode に関係なく world-readable にする
        file.set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(to_record_error)?;

        let mut contents = format!("{}\n", self.pid);
        if let Some(pgid) = self.pgid {
            contents.push_str(&format!("{pgid}\n"));
        }
        file.write_all(contents.as_bytes()).map_err(to_record_error)
    }

    /// Remove the record only if it still names `pid`. Returns whether it was removed.
    pub fn release(path: &Path, pid: i32) -> Result<bool, ServiceError> {
        match Self::load(path)? {
            Some(record) if record.pid == pid => Self::remove(path).map(|()| true),
            _ => Ok(false),
        }
    }

    /// Remove the record. A missing file is not an error.
    pub fn remove(path: &Path) -> Result<(), ServiceError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ServiceError::Record {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4242\n", Some(ServiceRecord { pid: 4242, pgid: None }))]
    #[case("4242\n4200\n", Some(ServiceRecord { pid: 4242, pgid: Some(4200) }))]
    #[case(" 4242 \n", Some(ServiceRecord { pid: 4242, pgid: None }))]
    #[case("4242\nnot-a-pgid\n", Some(ServiceRecord { pid: 4242, pgid: None }))]
    #[case("", None)]
    #[case("garbage\n", None)]
    #[case("0\n", None)]
    #[case("-1\n", None)]
    fn parse_cases(#[case] contents: &str, #[case] expected: Option<ServiceRecord>) {
        assert_eq!(ServiceRecord::parse(contents), expected);
    }

    #[test]
    fn store_load_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = ServiceRecord::path(dir.path(), "reportd");
        assert_eq!(path, dir.path().join("reportd.pid"));

        let record = ServiceRecord {
            pid: 31337,
            pgid: Some(31337),
        };
        record.store(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "31337\n31337\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(ServiceRecord::load(&path).unwrap(), Some(record));

        ServiceRecord::remove(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(ServiceRecord::load(&path).unwrap(), None);
        // removing twice is fine
        ServiceRecord::remove(&path).unwrap();
    }

    #[test]
    fn release_only_removes_a_matching_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = ServiceRecord::path(dir.path(), "reportd");
        let record = ServiceRecord {
            pid: 4242,
            pgid: None,
        };
        record.store(&path).unwrap();

        assert!(!ServiceRecord::release(&path, 4141).unwrap());
        assert_eq!(ServiceRecord::load(&path).unwrap(), Some(record));

        assert!(ServiceRecord::release(&path, 4242).unwrap());
        assert!(!path.exists());
        assert!(!ServiceRecord::release(&path, 4242).unwrap());
    }

    #[test]
    fn current_record_is_this_process() {
        let record = ServiceRecord::current();
        assert_eq!(record.pid as u32, std::process::id());
        assert!(record.pgid.is_some());
    }
}
