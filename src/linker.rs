//! Links shared libraries the server expects next to its binaries.
//!
//! FMS ships linked against a `libcap.so.*` soname that many distributions
//! only provide under a different version suffix. When nothing matching is
//! present in the install directory, the host's linker cache is searched and
//! the library it reports is symlinked in. This step is best effort: if the
//! cache has no match, the server start will report the missing library.

use std::path::{Path, PathBuf};
use std::process::Command;
use regex::Regex;
use tracing::{debug, info};
use crate::error::{RecipeError, Result};
use crate::util::symlink;

/// A library looked up by soname stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibrarySpec {
    /// Soname stem, e.g. `libcap`.
    pub stem: &'static str,
    /// Glob, relative to the install directory, that counts as already present.
    pub glob: &'static str,
}

pub const LIBCAP: LibrarySpec = LibrarySpec {
    stem: "libcap",
    glob: "libcap.so.*",
};

/// Finds the full path of a shared library on the host.
pub trait LibraryResolver {
    /// Returns the resolved path, or `None` when the host has no match.
    fn resolve(&self, library: &LibrarySpec) -> Result<Option<PathBuf>>;
}

/// Resolves libraries by scanning `ldconfig -p`.
///
/// The first candidate binary that runs successfully wins.
#[derive(Debug, Clone)]
pub struct LdconfigCache {
    candidates: Vec<PathBuf>,
}

impl Default for LdconfigCache {
    fn default() -> Self {
        Self {
            candidates: vec![PathBuf::from("/sbin/ldconfig"), PathBuf::from("ldconfig")],
        }
    }
}

impl LdconfigCache {
    pub fn with_command<P: AsRef<Path>>(command: P) -> Self {
        Self {
            candidates: vec![command.as_ref().to_path_buf()],
        }
    }

    /// The cache listing, or `None` if no candidate could be run.
    pub fn listing(&self) -> Option<String> {
        for candidate in &self.candidates {
            match Command::new(candidate).arg("-p").output() {
                Ok(output) if output.status.success() => {
                    return Some(String::from_utf8_lossy(&output.stdout).into_owned());
                }
                Ok(output) => debug!("{} -p exited with {}", candidate.display(), output.status),
                Err(e) => debug!("could not run {}: {e}", candidate.display()),
            }
        }
        None
    }
}

impl LibraryResolver for LdconfigCache {
    fn resolve(&self, library: &LibrarySpec) -> Result<Option<PathBuf>> {
        match self.listing() {
            Some(listing) => find_in_listing(&listing, library),
            None => Ok(None),
        }
    }
}

/// Returns the first absolute path in `listing` whose file name (the part
/// after the last `/`) starts with `<stem>.`.
///
/// ```
/// use fms_recipe::linker::{find_in_listing, LIBCAP};
///
/// let listing = "\tlibcap.so.2 (libc6,x86-64) => /lib/x86_64-linux-gnu/libcap.so.2\n";
/// let found = find_in_listing(listing, &LIBCAP).unwrap();
/// assert_eq!(found.unwrap().to_str(), Some("/lib/x86_64-linux-gnu/libcap.so.2"));
/// ```
pub fn find_in_listing(listing: &str, library: &LibrarySpec) -> Result<Option<PathBuf>> {
    let pattern = format!(r"/(?:[^()\s]*/)?{}\.[^()\s/]*", regex::escape(library.stem));
    let re = Regex::new(&pattern).map_err(|e| RecipeError::Config(e.to_string()))?;
    Ok(re.find(listing).map(|m| PathBuf::from(m.as_str())))
}

/// A symlink created by [`link_library`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkRequest {
    /// The glob that found nothing in the install directory.
    pub pattern: String,
    /// Library path reported by the resolver.
    pub source: PathBuf,
    /// Link created inside the install directory.
    pub destination: PathBuf,
}

/// Links `library` into `install_path` unless a matching file is already there.
///
/// Returns the created link, or `None` when nothing needed doing or the
/// resolver found no match. Only a failure to create the link is an error.
pub fn link_library<P, R>(install_path: P, library: &LibrarySpec, resolver: &R) -> Result<Option<SymlinkRequest>>
where
    P: AsRef<Path>,
    R: LibraryResolver + ?Sized,
{
    let install_path = install_path.as_ref();
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&install_path.to_string_lossy()),
        library.glob
    );
    let existing = glob::glob(&pattern)
        .map_err(|e| RecipeError::Config(e.to_string()))?
        .flatten()
        .next();
    if let Some(existing) = existing {
        debug!("{} already present", existing.display());
        return Ok(None);
    }

    if !cfg!(unix) {
        info!("Symlinking {} is only supported on unix hosts", library.stem);
        return Ok(None);
    }

    let Some(source) = resolver.resolve(library)? else {
        info!("No {} found in the linker cache; not linking", library.glob);
        return Ok(None);
    };
    let Some(file_name) = source.file_name() else {
        return Ok(None);
    };
    let destination = install_path.join(file_name);
    if destination.symlink_metadata().is_ok() {
        debug!("{} already exists", destination.display());
        return Ok(None);
    }

    symlink(&source, &destination)?;
    info!("Linked {} -> {}", destination.display(), source.display());
    Ok(Some(SymlinkRequest {
        pattern,
        source,
        destination,
    }))
}
