use std::path::{Path, PathBuf};
use tracing::info;
use crate::config::{InstallConfig, RecipeOptions, RecipePaths};
use crate::control::{control_script_path, patch_control_script, publish_control_script, ScriptPatch};
use crate::error::{file_access, Result};
use crate::extract::extract_package;
use crate::global::cache::{fetch_archive, scratch_dir};
use crate::ini::{apply_directives, config_path};
use crate::linker::{link_library, LdconfigCache, LibraryResolver, SymlinkRequest, LIBCAP};
use crate::services::{services_dir, write_service_descriptors};

/// Obtains and unpacks the release; only consulted on a fresh install.
pub trait PackageSource {
    fn fetch(&self, url: &str, cache_dir: &Path, sha256: Option<&str>) -> Result<PathBuf>;
    fn extract(&self, archive: &Path, scratch_dir: &Path, destination: &Path) -> Result<PathBuf>;
}

/// Downloads into the cache and unpacks with [`extract_package`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseArchive;

impl PackageSource for ReleaseArchive {
    fn fetch(&self, url: &str, cache_dir: &Path, sha256: Option<&str>) -> Result<PathBuf> {
        fetch_archive(url, cache_dir, sha256)
    }

    fn extract(&self, archive: &Path, scratch_dir: &Path, destination: &Path) -> Result<PathBuf> {
        extract_package(archive, scratch_dir, destination)
    }
}

/// Well-known paths inside an install location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub install_path: PathBuf,
    pub conf_path: PathBuf,
    pub control_script: PathBuf,
    pub services_dir: PathBuf,
}

impl InstalledPackage {
    pub fn at<P: AsRef<Path>>(install_path: P) -> Self {
        let install_path = install_path.as_ref();
        Self {
            install_path: install_path.to_path_buf(),
            conf_path: config_path(install_path),
            control_script: control_script_path(install_path),
            services_dir: services_dir(install_path),
        }
    }

    pub fn exists(&self) -> bool {
        self.install_path.exists()
    }
}

/// What an [`Installer::install`] run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub package: InstalledPackage,
    /// The archive used, when this run fetched and extracted the package.
    pub archive: Option<PathBuf>,
    pub descriptors: Vec<PathBuf>,
    pub script_patch: ScriptPatch,
    pub library_link: Option<SymlinkRequest>,
    pub published: PathBuf,
}

impl InstallReport {
    pub fn fresh_install(&self) -> bool {
        self.archive.is_some()
    }
}

/// Installs and configures one part.
///
/// Configuration is resolved once in the constructor; a missing required
/// option fails there, before anything is fetched or written.
pub struct Installer<S = ReleaseArchive, R = LdconfigCache> {
    config: InstallConfig,
    paths: RecipePaths,
    source: S,
    resolver: R,
}

impl Installer {
    /// An installer using the real download/extract and `ldconfig` collaborators.
    pub fn new(options: &RecipeOptions, paths: RecipePaths) -> Result<Self> {
        Self::with_collaborators(options, paths, ReleaseArchive, LdconfigCache::default())
    }
}

impl<S: PackageSource, R: LibraryResolver> Installer<S, R> {
    pub fn with_collaborators(options: &RecipeOptions, paths: RecipePaths, source: S, resolver: R) -> Result<Self> {
        let config = InstallConfig::resolve(options, paths.install_location()?)?;
        Ok(Self {
            config,
            paths,
            source,
            resolver,
        })
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    pub fn package(&self) -> InstalledPackage {
        InstalledPackage::at(&self.config.install_path)
    }

    /// Fetches and extracts the package if its install path is absent, then
    /// (re)applies every configuration step.
    ///
    /// Each configuration step is idempotent, so re-running after a failure
    /// is safe; there is no rollback.
    pub fn install(&self) -> Result<InstallReport> {
        let package = self.package();
        let archive = if package.exists() {
            info!(
                "{} already installed; reapplying configuration",
                package.install_path.display()
            );
            None
        } else {
            let cache_dir = &self.paths.download_cache;
            let archive = self.source.fetch(
                &self.config.download_url,
                cache_dir,
                self.config.download_sha256.as_deref(),
            )?;
            self.source
                .extract(&archive, &scratch_dir(cache_dir), &package.install_path)?;
            Some(archive)
        };

        let descriptors = write_service_descriptors(&package.install_path)?;
        let script_patch = patch_control_script(&package.control_script, &package.services_dir)?;
        apply_directives(&package.conf_path, &self.config)?;
        let library_link = link_library(&package.install_path, &LIBCAP, &self.resolver)?;
        let published = publish_control_script(&package.control_script, &self.paths.bin_directory)?;

        info!("Part [{}] installed at {}", self.paths.part_name, package.install_path.display());
        Ok(InstallReport {
            package,
            archive,
            descriptors,
            script_patch,
            library_link,
            published,
        })
    }

    /// Re-applies the `fms.ini` directives to an existing install.
    pub fn update(&self) -> Result<PathBuf> {
        let package = self.package();
        if !package.exists() {
            let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "package is not installed");
            return Err(file_access("update", &package.install_path)(missing));
        }
        apply_directives(&package.conf_path, &self.config)?;
        info!("Part [{}] configuration updated", self.paths.part_name);
        Ok(package.conf_path)
    }
}
