use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use crate::error::{file_access, RecipeError, Result};

/// Fixed name of the cached release archive.
///
/// The cache is not keyed by URL: pointing a part at a new release requires
/// clearing the cache first (see [`clean_cache`]).
pub const ARCHIVE_FILE_NAME: &str = "FMS_DOWNLOAD.tar.gz";

/// Scratch directory the archive is unpacked into, next to the archive.
pub const SCRATCH_DIR_NAME: &str = "fms-archive";

pub fn cached_archive_path<P: AsRef<Path>>(cache_dir: P) -> PathBuf {
    cache_dir.as_ref().join(ARCHIVE_FILE_NAME)
}

pub fn scratch_dir<P: AsRef<Path>>(cache_dir: P) -> PathBuf {
    cache_dir.as_ref().join(SCRATCH_DIR_NAME)
}

pub fn get_cached_archive<P: AsRef<Path>>(cache_dir: P) -> Option<PathBuf> {
    let path = cached_archive_path(cache_dir);
    path.exists().then_some(path)
}

/// Ensures the release archive is present in `cache_dir` and returns its path.
///
/// A cache hit performs no network access. On a miss the body is streamed
/// into a temporary file in `cache_dir` and only renamed to
/// [`ARCHIVE_FILE_NAME`] once it is complete, so an interrupted transfer never
/// leaves a file that looks cached. `file://` URLs are copied from disk.
///
/// When `expected_sha256` is given the archive is verified, on hits as well
/// as on fresh downloads.
///
/// # Errors
/// Returns [`RecipeError::Fetch`] for transport failures, non-success HTTP
/// statuses, truncated bodies and checksum mismatches.
pub fn fetch_archive<P: AsRef<Path>>(
    url: &str,
    cache_dir: P,
    expected_sha256: Option<&str>,
) -> Result<PathBuf> {
    let cache_dir = cache_dir.as_ref();
    let target = cached_archive_path(cache_dir);

    if target.exists() {
        info!("Using cached archive {}", target.display());
    } else {
        if !cache_dir.exists() {
            std::fs::create_dir_all(cache_dir).map_err(file_access("create", cache_dir))?;
            debug!("Cache directory created: {}", cache_dir.display());
        }
        info!("Downloading {url}");
        let mut partial = NamedTempFile::new_in(cache_dir).map_err(file_access("create", cache_dir))?;
        let bytes = match url.strip_prefix("file://") {
            Some(local) => copy_local(url, Path::new(local), partial.as_file_mut())?,
            None => download(url, partial.as_file_mut())?,
        };
        partial
            .as_file_mut()
            .flush()
            .map_err(file_access("write", partial.path()))?;
        partial
            .persist(&target)
            .map_err(|e| file_access("write", &target)(e.error))?;
        info!("Cached {bytes} bytes at {}", target.display());
    }

    if let Some(expected) = expected_sha256 {
        verify_sha256(url, &target, expected)?;
    }
    Ok(target)
}

fn download(url: &str, out: &mut File) -> Result<u64> {
    let mut response = reqwest::blocking::get(url).map_err(|e| RecipeError::fetch(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(RecipeError::fetch(url, format!("server responded with {status}")));
    }
    let expected = response.content_length();
    let copied = response.copy_to(out).map_err(|e| RecipeError::fetch(url, e))?;
    if let Some(expected) = expected {
        if copied != expected {
            return Err(RecipeError::fetch(
                url,
                format!("transfer incomplete: received {copied} of {expected} bytes"),
            ));
        }
    }
    Ok(copied)
}

fn copy_local(url: &str, source: &Path, out: &mut File) -> Result<u64> {
    let mut input = File::open(source).map_err(|e| RecipeError::fetch(url, e))?;
    std::io::copy(&mut input, out).map_err(|e| RecipeError::fetch(url, e))
}

fn verify_sha256(url: &str, path: &Path, expected: &str) -> Result<()> {
    let mut file = File::open(path).map_err(file_access("read", path))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(file_access("read", path))?;
    let actual = hex::encode(hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(RecipeError::fetch(
            url,
            format!(
                "checksum mismatch for {}: expected {expected}, got {actual}",
                path.display()
            ),
        ));
    }
    debug!("Verified sha256 of {}", path.display());
    Ok(())
}

/// Removes the cached archive and any scratch directory left by a failed run.
pub fn clean_cache<P: AsRef<Path>>(cache_dir: P) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    if let Some(archive) = get_cached_archive(&cache_dir) {
        std::fs::remove_file(&archive).map_err(file_access("remove", &archive))?;
        removed.push(archive);
    }
    let scratch = scratch_dir(&cache_dir);
    if scratch.exists() {
        warn!("Removing leftover scratch directory {}", scratch.display());
        std::fs::remove_dir_all(&scratch).map_err(file_access("remove", &scratch))?;
        removed.push(scratch);
    }
    Ok(removed)
}
