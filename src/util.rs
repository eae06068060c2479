use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;
use crate::error::{file_access, Result};

/// Ensures `path` and its parents exist.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(file_access("create", path))
}

/// Moves a directory tree, falling back to copy-then-delete when `from` and
/// `to` are on different filesystems.
pub fn move_dir<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename {} -> {} failed ({e}), copying instead", from.display(), to.display());
            copy_dir_all(from, to)?;
            std::fs::remove_dir_all(from).map_err(file_access("remove", from))
        }
    }
}

/// Recursively copies `from` into `to`, keeping file permissions and
/// recreating symlinks rather than following them.
pub fn copy_dir_all<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| file_access("list", from)(e.into()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(&target)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path()).map_err(file_access("read link", entry.path()))?;
            symlink(&link, &target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(file_access("copy", entry.path()))?;
        }
    }
    Ok(())
}

/// Creates a symbolic link at `link` pointing to `original`.
#[cfg(unix)]
pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    let link = link.as_ref();
    std::os::unix::fs::symlink(original, link).map_err(file_access("symlink", link))
}

#[cfg(not(unix))]
pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    let link = link.as_ref();
    std::fs::copy(original, link)
        .map(|_| ())
        .map_err(file_access("copy", link))
}
