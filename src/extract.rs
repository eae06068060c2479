use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use flate2::read::GzDecoder;
use tracing::{debug, info, warn};
use crate::error::{file_access, RecipeError, Result};
use crate::util::move_dir;

/// Container formats a release archive may come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Sniffs the format from the leading bytes; the cached file name always
    /// ends in `.tar.gz` regardless of what was downloaded.
    pub fn detect<P: AsRef<Path>>(archive: P) -> Result<ArchiveFormat> {
        let archive = archive.as_ref();
        let mut magic = [0u8; 4];
        let mut file = File::open(archive).map_err(|e| RecipeError::extraction(archive, e))?;
        let read = file.read(&mut magic).map_err(|e| RecipeError::extraction(archive, e))?;
        Ok(match &magic[..read] {
            [0x1f, 0x8b, ..] => ArchiveFormat::TarGz,
            [b'P', b'K', 0x03, 0x04] => ArchiveFormat::Zip,
            _ => ArchiveFormat::Tar,
        })
    }
}

/// Unpacks `archive` into `scratch_dir`, moves its single top-level directory
/// to `destination`, then deletes `scratch_dir`.
///
/// The archive must contain exactly one top-level entry and it must be a
/// directory; the package root carries a version number in its name, so it
/// is not looked up by name. On failure `scratch_dir` is left in place for
/// inspection.
///
/// # Errors
/// Returns [`RecipeError::Extraction`] if `destination` already exists, the
/// archive is unreadable, or the root is missing, ambiguous or not a
/// directory. Moving the root can fail with [`RecipeError::FileAccess`].
pub fn extract_package<A, S, D>(archive: A, scratch_dir: S, destination: D) -> Result<PathBuf>
where
    A: AsRef<Path>,
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    let (archive, scratch_dir, destination) = (archive.as_ref(), scratch_dir.as_ref(), destination.as_ref());
    if destination.exists() {
        return Err(RecipeError::extraction(
            archive,
            format!("destination {} already exists", destination.display()),
        ));
    }
    if scratch_dir.exists() {
        warn!("Removing stale scratch directory {}", scratch_dir.display());
        std::fs::remove_dir_all(scratch_dir).map_err(file_access("remove", scratch_dir))?;
    }
    std::fs::create_dir_all(scratch_dir).map_err(file_access("create", scratch_dir))?;

    let format = ArchiveFormat::detect(archive)?;
    info!("Extracting {} ({format:?}) into {}", archive.display(), scratch_dir.display());
    unpack(archive, format, scratch_dir)?;

    let root = single_root(archive, scratch_dir)?;
    debug!("Package root is {}", root.display());
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(file_access("create", parent))?;
    }
    move_dir(&root, destination)?;
    std::fs::remove_dir_all(scratch_dir).map_err(file_access("remove", scratch_dir))?;

    info!("Installed package root to {}", destination.display());
    Ok(destination.to_path_buf())
}

fn unpack(archive: &Path, format: ArchiveFormat, scratch_dir: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| RecipeError::extraction(archive, e))?;
    match format {
        ArchiveFormat::TarGz => tar::Archive::new(GzDecoder::new(file))
            .unpack(scratch_dir)
            .map_err(|e| RecipeError::extraction(archive, e)),
        ArchiveFormat::Tar => tar::Archive::new(file)
            .unpack(scratch_dir)
            .map_err(|e| RecipeError::extraction(archive, e)),
        ArchiveFormat::Zip => zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(scratch_dir))
            .map_err(|e| RecipeError::extraction(archive, e)),
    }
}

fn single_root(archive: &Path, scratch_dir: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(scratch_dir)
        .map_err(file_access("list", scratch_dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(file_access("list", scratch_dir))?;
    entries.sort();

    match entries.as_slice() {
        [] => Err(RecipeError::extraction(archive, "archive contains no entries")),
        [root] if root.is_dir() => Ok(root.clone()),
        [root] => Err(RecipeError::extraction(
            archive,
            format!("top-level entry {} is not a directory", root.display()),
        )),
        many => {
            let names: Vec<String> = many
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(RecipeError::extraction(
                archive,
                format!("expected a single top-level directory, found {}: {}", names.len(), names.join(", ")),
            ))
        }
    }
}
