//! Path validation for file mutations.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::ExecutionError;

const PROTECTED_PATHS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/dev",
    "/proc",
    "/Library",
    "/Applications",
    "/private",
    "/var",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
];

/// Keeps mutations inside the folders the user granted
#[derive(Debug, Default)]
pub struct PathGuard {
    roots: RwLock<Vec<PathBuf>>,
}

impl PathGuard {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let guard = Self::default();
        for root in roots {
            guard.allow_root(root);
        }
        guard
    }

    /// Add a folder mutations may touch
    pub fn allow_root(&self, root: impl AsRef<Path>) {
        let root = canonical(root.as_ref());
        let mut roots = match self.roots.write() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !roots.contains(&root) {
            tracing::debug!(root = %root.display(), "[PathGuard] Root allowed");
            roots.push(root);
        }
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        match self.roots.read() {
            Ok(r) => r.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Check a path is inside a granted root and not a protected system path.
    ///
    /// The path itself need not exist yet; its parent is resolved instead.
    pub fn check(&self, path: &Path) -> Result<(), ExecutionError> {
        let resolved = resolve_for_check(path);

        if is_protected_path(&resolved) {
            return Err(ExecutionError::ProtectedPath(path.display().to_string()));
        }

        let inside = self
            .roots()
            .iter()
            .any(|root| resolved.starts_with(root) && resolved != *root);
        if !inside {
            return Err(ExecutionError::OutsideGrantedRoot(path.display().to_string()));
        }
        Ok(())
    }
}

/// Whether a path is a system location or a home directory itself.
///
/// Direct children of protected paths are protected too, unless they live
/// under the user's home.
pub fn is_protected_path(path: &Path) -> bool {
    let check_path = canonical(path);
    let home = dirs::home_dir();

    for protected in PROTECTED_PATHS.iter().map(Path::new) {
        if check_path == protected {
            return true;
        }
        if check_path.starts_with(protected) {
            if let Some(home) = &home {
                if check_path.starts_with(home) {
                    continue;
                }
            }
            if check_path.parent() == Some(protected) {
                return true;
            }
        }
    }

    matches!(&home, Some(home) if check_path == *home)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve the deepest existing ancestor and re-append the rest.
///
/// The final component is never followed, so a symlink target is checked by
/// its own location.
fn resolve_for_check(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return canonical(path);
    };

    let mut existing = parent;
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            let mut out = resolved;
            for part in rest.iter().rev() {
                out.push(part);
            }
            out.push(name);
            return out;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(up), Some(part)) => {
                rest.push(part);
                existing = up;
            }
            _ => return path.to_path_buf(),
        }
    }
}
