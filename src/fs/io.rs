//! Low-level file helpers that never follow symlinks.
//!
//! Everything that mutates the disk checks the exact file type first, so a
//! symlink, device node, FIFO or socket is refused instead of being moved.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ExecutionError;

/// Raw OS error for a rename across filesystems
const EXDEV: i32 = 18;

/// File type as seen without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Other,
}

impl FileKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FileKind::Regular => "regular file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symlink",
            FileKind::BlockDevice => "block device",
            FileKind::CharDevice => "character device",
            FileKind::Fifo => "FIFO",
            FileKind::Socket => "socket",
            FileKind::Other => "special file",
        }
    }
}

/// Get the file kind without following symlinks
pub fn file_kind_no_follow(path: &Path) -> io::Result<FileKind> {
    let file_type = fs::symlink_metadata(path)?.file_type();

    if file_type.is_symlink() {
        return Ok(FileKind::Symlink);
    }
    if file_type.is_file() {
        return Ok(FileKind::Regular);
    }
    if file_type.is_dir() {
        return Ok(FileKind::Directory);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;

        if file_type.is_block_device() {
            return Ok(FileKind::BlockDevice);
        }
        if file_type.is_char_device() {
            return Ok(FileKind::CharDevice);
        }
        if file_type.is_fifo() {
            return Ok(FileKind::Fifo);
        }
        if file_type.is_socket() {
            return Ok(FileKind::Socket);
        }
    }

    Ok(FileKind::Other)
}

/// Refuse anything that is not a regular file
pub fn ensure_regular_file(path: &Path) -> Result<(), ExecutionError> {
    let kind = file_kind_no_follow(path).map_err(|e| ExecutionError::from_io(&e, path))?;
    if kind == FileKind::Regular {
        return Ok(());
    }
    Err(ExecutionError::UnsafeFileType {
        path: path.display().to_string(),
        kind: kind.describe().to_string(),
    })
}

/// Whether anything, including a dangling symlink, exists at `path`
pub fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Copy a regular file without ever replacing an existing target
pub fn copy_no_clobber(from: &Path, to: &Path) -> io::Result<u64> {
    let mut source = File::open(from)?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;

    let copied = match io::copy(&mut source, &mut target).and_then(|n| target.sync_all().map(|_| n)) {
        Ok(n) => n,
        Err(e) => {
            drop(target);
            let _ = fs::remove_file(to);
            return Err(e);
        }
    };

    if let Ok(meta) = source.metadata() {
        let _ = fs::set_permissions(to, meta.permissions());
    }
    Ok(copied)
}

/// Rename, falling back to copy + remove when crossing filesystems
pub fn rename_or_copy(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(EXDEV) => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                "[FileMover] Cross-device move, copying instead"
            );
            copy_no_clobber(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Sync a directory so a completed rename survives a crash
pub fn sync_directory(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(path)?.sync_all()?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

/// First free `name`, `name (1)`, `name (2)`, ... inside `dir`
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !exists_no_follow(&candidate) {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let extension = as_path.extension().map(|e| e.to_string_lossy().to_string());

    let mut n = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);
        if !exists_no_follow(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_kind_no_follow() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "content").unwrap();
        assert_eq!(file_kind_no_follow(&file).unwrap(), FileKind::Regular);
        assert_eq!(file_kind_no_follow(dir.path()).unwrap(), FileKind::Directory);

        #[cfg(unix)]
        {
            let link = dir.path().join("link.txt");
            std::os::unix::fs::symlink(&file, &link).unwrap();
            assert_eq!(file_kind_no_follow(&link).unwrap(), FileKind::Symlink);
            assert!(matches!(
                ensure_regular_file(&link),
                Err(ExecutionError::UnsafeFileType { .. })
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_char_device_is_refused() {
        let devnull = Path::new("/dev/null");
        assert_eq!(file_kind_no_follow(devnull).unwrap(), FileKind::CharDevice);
        match ensure_regular_file(devnull) {
            Err(ExecutionError::UnsafeFileType { kind, .. }) => assert_eq!(kind, "character device"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ensure_regular_file(&dir.path().join("gone.pdf")),
            Err(ExecutionError::NotFound(_))
        ));
    }

    #[test]
    fn test_copy_no_clobber() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, "new").unwrap();

        copy_no_clobber(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");

        fs::write(&dst, "keep").unwrap();
        let err = copy_no_clobber(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "keep");
    }

    #[test]
    fn test_unique_path() {
        let dir = tempdir().unwrap();
        assert_eq!(unique_path(dir.path(), "a.pdf"), dir.path().join("a.pdf"));

        fs::write(dir.path().join("a.pdf"), "").unwrap();
        fs::write(dir.path().join("a (1).pdf"), "").unwrap();
        assert_eq!(unique_path(dir.path(), "a.pdf"), dir.path().join("a (2).pdf"));

        fs::write(dir.path().join("README"), "").unwrap();
        assert_eq!(unique_path(dir.path(), "README"), dir.path().join("README (1)"));
    }
}
