//! Synchronous size and free-space queries.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Size of `path` in bytes, or -1 if it does not exist.
pub fn file_size(path: &Path) -> i64 {
    match fs::metadata(path) {
        Ok(metadata) => i64::try_from(metadata.len()).unwrap_or(i64::MAX),
        Err(_) => -1,
    }
}

/// Bytes available on the volume containing `path`.
///
/// Returns 0 when the volume cannot be resolved or queried.
pub fn available_space(path: &Path) -> u64 {
    available_space_with(path, free_bytes)
}

/// [`available_space`] with a custom free-space query for the resolved root.
pub fn available_space_with(path: &Path, query: impl FnOnce(&Path) -> io::Result<u64>) -> u64 {
    let Some(root) = volume_root(path) else {
        debug!(path = %path.display(), "could not resolve volume root");
        return 0;
    };

    match query(&root) {
        Ok(available) => {
            debug!(root = %root.display(), available, "queried available space");
            available
        }
        Err(e) => {
            debug!(root = %root.display(), error = %e, "free-space query failed");
            0
        }
    }
}

/// Root of the volume containing `path`.
///
/// With drive-letter paths this is the drive root (`C:/`).
#[cfg(windows)]
pub fn volume_root(path: &Path) -> Option<PathBuf> {
    drive_root(&path.to_string_lossy())
        .or_else(|| drive_root(&absolute_path(path).to_string_lossy()))
}

/// Root of the volume containing `path`.
///
/// This is the mount point of the filesystem holding the absolute form of
/// `path`, or of its nearest existing ancestor. An empty path means the
/// filesystem root.
#[cfg(not(windows))]
pub fn volume_root(path: &Path) -> Option<PathBuf> {
    mount_point(&absolute_path(path))
}

/// Drive root (`X:/`, letter uppercased) of a drive-letter path, if it has one.
pub fn drive_root(path: &str) -> Option<PathBuf> {
    let normalized = path.replace('\\', "/");
    let mut chars = normalized.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => Some(PathBuf::from(format!(
            "{}:/",
            letter.to_ascii_uppercase()
        ))),
        _ => None,
    }
}

/// Walk up from `absolute` until the device changes.
#[cfg(unix)]
fn mount_point(absolute: &Path) -> Option<PathBuf> {
    use std::os::unix::fs::MetadataExt;

    let mut root = absolute.ancestors().find(|p| p.exists())?;
    let device = fs::metadata(root).ok()?.dev();

    while let Some(parent) = root.parent() {
        match fs::metadata(parent) {
            Ok(metadata) if metadata.dev() == device => root = parent,
            _ => break,
        }
    }
    Some(root.to_path_buf())
}

#[cfg(not(unix))]
fn mount_point(absolute: &Path) -> Option<PathBuf> {
    absolute.ancestors().last().map(Path::to_path_buf)
}

#[cfg(unix)]
fn free_bytes(root: &Path) -> io::Result<u64> {
    let stat = nix::sys::statvfs::statvfs(root).map_err(io::Error::from)?;
    Ok((stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64))
}

#[cfg(windows)]
fn free_bytes(root: &Path) -> io::Result<u64> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

    let wide: Vec<u16> = root
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let mut available = 0u64;
    let mut total = 0u64;
    let mut free = 0u64;

    // SAFETY: `wide` is NUL-terminated and outlives the call; the out
    // pointers reference live locals.
    let ok = unsafe { GetDiskFreeSpaceExW(wide.as_ptr(), &mut available, &mut total, &mut free) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(available)
}

#[cfg(not(any(unix, windows)))]
fn free_bytes(_root: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "free-space queries are not supported on this platform",
    ))
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        return PathBuf::from("/");
    }
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_size_missing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(file_size(&temp.path().join("missing.img")), -1);
    }

    #[test]
    fn test_file_size_exact() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.img");
        fs::write(&file, vec![0u8; 4321]).unwrap();
        assert_eq!(file_size(&file), 4321);
    }

    #[test]
    fn test_drive_root() {
        assert_eq!(drive_root("C:\\images\\a.img"), Some(PathBuf::from("C:/")));
        assert_eq!(drive_root("/home/user"), None);
        assert_eq!(drive_root(""), None);
        assert_eq!(drive_root("1:/x"), None);
    }

    #[test]
    fn test_drive_root_uppercases_letter() {
        assert_eq!(drive_root("d:/x"), Some(PathBuf::from("D:/")));
        assert_eq!(drive_root("e:\\stage"), drive_root("E:/stage"));
    }

    #[test]
    fn test_available_space_queries_resolved_root() {
        let temp = TempDir::new().unwrap();
        let expected = volume_root(temp.path()).unwrap();

        let mut seen = None;
        let available = available_space_with(temp.path(), |root| {
            seen = Some(root.to_path_buf());
            Ok(4242)
        });

        assert_eq!(available, 4242);
        assert_eq!(seen, Some(expected));
    }

    #[test]
    fn test_available_space_query_failure_is_zero() {
        let temp = TempDir::new().unwrap();
        let available = available_space_with(temp.path(), |_| {
            Err(io::Error::other("unreachable volume"))
        });
        assert_eq!(available, 0);
    }

    #[test]
    fn test_available_space_on_real_volume() {
        let temp = TempDir::new().unwrap();
        assert!(available_space(temp.path()) > 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_volume_root_is_mount_point() {
        use std::os::unix::fs::MetadataExt;

        let temp = TempDir::new().unwrap();
        let canonical = fs::canonicalize(temp.path()).unwrap();
        let root = volume_root(temp.path()).unwrap();
        let device = fs::metadata(&canonical).unwrap().dev();

        assert!(canonical.starts_with(&root));
        assert_eq!(fs::metadata(&root).unwrap().dev(), device);
        if let Some(parent) = root.parent() {
            assert_ne!(fs::metadata(parent).unwrap().dev(), device);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_volume_root_of_missing_path_uses_existing_ancestor() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("not/yet/created.img");
        assert_eq!(volume_root(&missing), volume_root(temp.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_volume_root_of_empty_path_is_filesystem_root() {
        assert_eq!(volume_root(Path::new("")), Some(PathBuf::from("/")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_separate_mount_gets_its_own_root() {
        use std::os::unix::fs::MetadataExt;

        // /dev/shm is a tmpfs on most Linux systems.
        let shm = Path::new("/dev/shm");
        let (Ok(shm_meta), Ok(root_meta)) = (fs::metadata(shm), fs::metadata("/")) else {
            return;
        };
        if shm_meta.dev() == root_meta.dev() {
            return;
        }

        let root = volume_root(&shm.join("stage.img")).unwrap();
        assert_ne!(root, PathBuf::from("/"));
        assert!(shm.starts_with(&root));
    }
}
