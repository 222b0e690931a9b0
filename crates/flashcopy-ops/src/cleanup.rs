//! Best-effort removal of a copy's staging directory.
//!
//! Cleanup never fails: every error is logged and absorbed, so it cannot
//! mask the outcome of the copy it follows.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// Filesystem removal primitives used by [`cleanup_temp_dir_with`].
pub trait DirRemover {
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Remove a single, empty directory entry.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`DirRemover`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdRemover;

impl DirRemover for StdRemover {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

/// How the staging directory itself ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStatus {
    /// The directory did not exist; nothing was touched.
    Missing,
    /// Recursive removal succeeded.
    Removed,
    /// Recursive removal failed but the single-entry fallback succeeded.
    RemovedByFallback,
    /// Both recursive removal and the fallback failed.
    Failed,
}

/// Summary of one cleanup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub status: CleanupStatus,
    pub files_removed: usize,
    pub files_failed: usize,
    pub dirs_removed: usize,
    pub dirs_failed: usize,
}

impl CleanupReport {
    fn new(status: CleanupStatus) -> Self {
        Self {
            status,
            files_removed: 0,
            files_failed: 0,
            dirs_removed: 0,
            dirs_failed: 0,
        }
    }

    /// Whether the directory is gone (or never existed).
    pub fn is_clean(&self) -> bool {
        self.status != CleanupStatus::Failed
    }
}

/// Remove `dir` and everything in it using `std::fs`.
pub fn cleanup_temp_dir(dir: &Path) -> CleanupReport {
    cleanup_temp_dir_with(&StdRemover, dir)
}

/// Remove `dir` and everything in it.
///
/// Direct files go first, then direct subdirectories, then `dir` itself.
/// If removing `dir` recursively fails, one plain removal of the entry
/// from its parent is attempted.
pub fn cleanup_temp_dir_with<R: DirRemover + ?Sized>(remover: &R, dir: &Path) -> CleanupReport {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "temporary directory does not exist");
        return CleanupReport::new(CleanupStatus::Missing);
    }

    let mut report = CleanupReport::new(CleanupStatus::Failed);
    let mut subdirs = Vec::new();

    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                // Symlinks are removed as entries, never followed.
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    subdirs.push(path);
                    continue;
                }
                match remover.remove_file(&path) {
                    Ok(()) => report.files_removed += 1,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to remove file");
                        report.files_failed += 1;
                    }
                }
            }
        }
        Err(e) => warn!(dir = %dir.display(), error = %e, "failed to list temporary directory"),
    }

    for subdir in subdirs {
        match remover.remove_dir_all(&subdir) {
            Ok(()) => report.dirs_removed += 1,
            Err(e) => {
                warn!(path = %subdir.display(), error = %e, "failed to remove subdirectory");
                report.dirs_failed += 1;
            }
        }
    }

    if remover.remove_dir_all(dir).is_ok() {
        debug!(dir = %dir.display(), "removed temporary directory");
        report.status = CleanupStatus::Removed;
        return report;
    }

    warn!(dir = %dir.display(), "failed to remove temporary directory, retrying as a single entry");
    let entry = match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => dir.to_path_buf(),
    };
    match remover.remove_dir(&entry) {
        Ok(()) => {
            debug!(dir = %dir.display(), "fallback removal succeeded");
            report.status = CleanupStatus::RemovedByFallback;
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "fallback removal also failed");
            report.status = CleanupStatus::Failed;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Refuses recursive removal of one path and counts fallback attempts.
    struct StubbornRemover {
        stubborn: PathBuf,
        allow_fallback: bool,
        fallback_calls: Cell<usize>,
    }

    impl StubbornRemover {
        fn new(stubborn: &Path, allow_fallback: bool) -> Self {
            Self {
                stubborn: stubborn.to_path_buf(),
                allow_fallback,
                fallback_calls: Cell::new(0),
            }
        }
    }

    impl DirRemover for StubbornRemover {
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            fs::remove_file(path)
        }

        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            if path == self.stubborn {
                return Err(io::Error::new(io::ErrorKind::ResourceBusy, "handle open"));
            }
            fs::remove_dir_all(path)
        }

        fn remove_dir(&self, path: &Path) -> io::Result<()> {
            self.fallback_calls.set(self.fallback_calls.get() + 1);
            if self.allow_fallback {
                fs::remove_dir(path)
            } else {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            }
        }
    }

    fn populate(root: &Path) {
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("a.img"), b"aaaa").unwrap();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("sub/c.bin"), b"cc").unwrap();
        fs::write(root.join("sub/deeper/d.bin"), b"ddd").unwrap();
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("stage1");

        let report = cleanup_temp_dir(&missing);

        assert_eq!(report.status, CleanupStatus::Missing);
        assert!(report.is_clean());
        assert!(!missing.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cleanup_removes_files_and_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let stage = temp.path().join("stage1");
        populate(&stage);

        let report = cleanup_temp_dir(&stage);

        assert_eq!(report.status, CleanupStatus::Removed);
        assert_eq!(report.files_removed, 2);
        assert_eq!(report.dirs_removed, 2);
        assert_eq!(report.files_failed + report.dirs_failed, 0);
        assert!(!stage.exists());
    }

    #[test]
    fn test_cleanup_falls_back_once_when_recursive_removal_fails() {
        let temp = TempDir::new().unwrap();
        let stage = temp.path().join("stage1");
        populate(&stage);
        let remover = StubbornRemover::new(&stage, true);

        let report = cleanup_temp_dir_with(&remover, &stage);

        assert_eq!(report.status, CleanupStatus::RemovedByFallback);
        assert_eq!(remover.fallback_calls.get(), 1);
        assert!(!stage.exists());
    }

    #[test]
    fn test_cleanup_reports_failure_without_panicking() {
        let temp = TempDir::new().unwrap();
        let stage = temp.path().join("stage1");
        populate(&stage);
        let remover = StubbornRemover::new(&stage, false);

        let report = cleanup_temp_dir_with(&remover, &stage);

        assert_eq!(report.status, CleanupStatus::Failed);
        assert!(!report.is_clean());
        assert_eq!(remover.fallback_calls.get(), 1);
        // Contents were still cleared.
        assert_eq!(fs::read_dir(&stage).unwrap().count(), 0);
    }

    #[test]
    fn test_cleanup_continues_after_subdirectory_failure() {
        let temp = TempDir::new().unwrap();
        let stage = temp.path().join("stage1");
        populate(&stage);
        let remover = StubbornRemover::new(&stage.join("sub"), true);

        let report = cleanup_temp_dir_with(&remover, &stage);

        assert_eq!(report.dirs_failed, 1);
        assert_eq!(report.dirs_removed, 1);
        assert_eq!(report.files_removed, 2);
        // The final recursive pass still clears the stubborn subdirectory
        // because only its direct removal was refused.
        assert_eq!(report.status, CleanupStatus::Removed);
        assert_eq!(remover.fallback_calls.get(), 0);
    }

    #[test]
    fn test_cleanup_ignores_plain_file_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let report = cleanup_temp_dir(&file);

        assert_eq!(report.status, CleanupStatus::Missing);
        assert!(file.exists());
    }
}
