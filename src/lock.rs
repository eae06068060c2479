use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use fs2::FileExt;
use tracing::debug;
use crate::error::{file_access, Result};

/// An open file holding an exclusive advisory lock (`flock(LOCK_EX)`).
///
/// Patchers acquire one of these for a single read-modify-write cycle:
/// read the whole file, mutate it in memory, then [`LockedFile::replace_contents`]
/// once. The lock is released when the value is dropped, so two concurrent
/// `update` runs against the same file serialize instead of interleaving.
pub struct LockedFile {
    file: File,
    path: PathBuf,
}

impl LockedFile {
    /// Opens `path` for reading and writing and blocks until the lock is held.
    ///
    /// The file must already exist; patchers never create their targets.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(file_access("open", &path))?;
        FileExt::lock_exclusive(&file).map_err(file_access("lock", &path))?;
        debug!("Acquired lock on {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file from the start.
    pub fn read_to_string(&mut self) -> Result<String> {
        let mut contents = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut contents))
            .map_err(file_access("read", &self.path))?;
        Ok(contents)
    }

    /// Truncates the file and writes `contents` through the locked handle.
    pub fn replace_contents(&mut self, contents: &str) -> Result<()> {
        let file = &mut self.file;
        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(contents.as_bytes()))
            .and_then(|_| file.sync_all())
            .map_err(file_access("write", &self.path))
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Released lock on {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_replace_contents_shrinks_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fms.ini");
        std::fs::write(&path, "a much longer original body\n").unwrap();

        let mut locked = LockedFile::acquire(&path).unwrap();
        assert_eq!(locked.read_to_string().unwrap(), "a much longer original body\n");
        locked.replace_contents("short\n").unwrap();
        drop(locked);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short\n");
    }

    #[test]
    fn test_acquire_missing_file_is_file_access_error() {
        let dir = tempdir().unwrap();
        let err = LockedFile::acquire(dir.path().join("missing.ini")).err().unwrap();
        assert!(matches!(err, crate::RecipeError::FileAccess { action: "open", .. }));
    }

    #[test]
    fn test_lock_excludes_other_handles_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fms.ini");
        std::fs::write(&path, "SERVER.ADMIN_USERNAME = \n").unwrap();

        let first = LockedFile::acquire(&path).unwrap();
        let other = File::open(&path).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_err());

        drop(first);
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fmsmgr");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();

        let first = LockedFile::acquire(&path).unwrap();
        drop(first);
        let probe = File::open(&path).unwrap();
        assert!(FileExt::try_lock_exclusive(&probe).is_ok());
    }
}
