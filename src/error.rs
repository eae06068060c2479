use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, RecipeError>;

/// Everything that can abort an `install` or `update` run.
///
/// An unresolved shared library is not an error; the linker step reports
/// "nothing linked" instead.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// The release archive could not be downloaded or failed verification.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The archive could not be unpacked or did not have a single package root.
    #[error("failed to extract {}: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    /// A required option is absent from the recipe part.
    #[error("missing required option `{key}` in part [{part}]")]
    MissingConfigKey { part: String, key: String },

    /// A read, write, copy, lock or symlink against an expected path failed.
    #[error("cannot {action} {}: {source}", path.display())]
    FileAccess {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The recipe file itself is malformed.
    #[error("invalid recipe configuration: {0}")]
    Config(String),
}

impl RecipeError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction<P: AsRef<Path>>(archive: P, reason: impl ToString) -> Self {
        Self::Extraction {
            archive: archive.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Builds a `map_err` adapter that tags an I/O error with the action and path.
///
/// ```
/// use fms_recipe::error::file_access;
///
/// let err = std::fs::read_to_string("/nonexistent/fms.ini")
///     .map_err(file_access("read", "/nonexistent/fms.ini"))
///     .unwrap_err();
/// assert!(err.to_string().starts_with("cannot read /nonexistent/fms.ini"));
/// ```
pub fn file_access<P: AsRef<Path>>(
    action: &'static str,
    path: P,
) -> impl FnOnce(std::io::Error) -> RecipeError {
    let path = path.as_ref().to_path_buf();
    move |source| RecipeError::FileAccess {
        action,
        path,
        source,
    }
}
