use std::path::PathBuf;
use directories::ProjectDirs;
use crate::error::{RecipeError, Result};

fn get_global_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "fms-recipe", "fms-recipe")
        .ok_or_else(|| RecipeError::Config("could not determine a home directory for the download cache".to_string()))
}

/// Per-user cache directory, used when no download cache is configured.
pub fn get_global_cache_dir() -> Result<PathBuf> {
    Ok(get_global_dirs()?.cache_dir().to_path_buf())
}
