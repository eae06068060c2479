use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::config::{RecipeOptions, RecipePaths};
use crate::error::{file_access, RecipeError, Result};

/// Part name used when the recipe file defines several parts and none is chosen.
pub const DEFAULT_PART: &str = "fms";

/// Represents the contents of a recipe file.
///
/// The `[buildout]` table carries the framework-wide locations; every other
/// table is a part whose name becomes the install directory name.
#[derive(Deserialize, Debug, Default)]
pub struct RecipeToml {
    /// Framework-wide directories.
    #[serde(default)]
    pub buildout: BuildoutSection,
    /// Part name to its raw options.
    #[serde(flatten)]
    pub parts: BTreeMap<String, toml::Table>,
}

/// The `[buildout]` table of a recipe file.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct BuildoutSection {
    /// Where each part's install directory is created.
    pub parts_directory: Option<PathBuf>,
    /// Shared directory receiving the control script.
    pub bin_directory: Option<PathBuf>,
    /// Where the release archive is cached and unpacked.
    pub download_cache: Option<PathBuf>,
}

impl RecipeToml {
    /// Loads a recipe file from disk.
    ///
    /// # Errors
    /// Returns a file access error if it cannot be read, or a configuration
    /// error if it is not valid TOML of the expected shape.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecipeToml> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(file_access("read", path))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<RecipeToml> {
        toml::from_str(text).map_err(|e| RecipeError::Config(e.to_string()))
    }

    /// The part to act on when none is named: the only part if there is
    /// exactly one, otherwise [`DEFAULT_PART`].
    pub fn default_part_name(&self) -> &str {
        match self.parts.keys().next() {
            Some(name) if self.parts.len() == 1 => name.as_str(),
            _ => DEFAULT_PART,
        }
    }

    /// Options for the named part.
    ///
    /// # Errors
    /// Returns a configuration error if the part does not exist.
    pub fn part_options(&self, part: &str) -> Result<RecipeOptions> {
        let table = self
            .parts
            .get(part)
            .ok_or_else(|| RecipeError::Config(format!("no part named [{part}] in recipe file")))?;
        RecipeOptions::from_table(part, table)
    }

    /// Resolves framework locations for `part`, preferring explicit overrides.
    ///
    /// `fallback_cache` is used when neither the override nor `[buildout]`
    /// names a download cache.
    pub fn paths(
        &self,
        part: &str,
        overrides: &BuildoutSection,
        fallback_cache: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<RecipePaths> {
        let pick = |over: &Option<PathBuf>, file: &Option<PathBuf>| over.clone().or_else(|| file.clone());
        let missing = |key: &str| RecipeError::Config(format!("`{key}` is not set in [buildout] or on the command line"));

        let parts_directory = pick(&overrides.parts_directory, &self.buildout.parts_directory)
            .ok_or_else(|| missing("parts-directory"))?;
        let bin_directory = pick(&overrides.bin_directory, &self.buildout.bin_directory)
            .ok_or_else(|| missing("bin-directory"))?;
        let download_cache = match pick(&overrides.download_cache, &self.buildout.download_cache) {
            Some(dir) => dir,
            None => fallback_cache()?,
        };

        Ok(RecipePaths {
            part_name: part.to_string(),
            parts_directory,
            bin_directory,
            download_cache,
        })
    }
}
