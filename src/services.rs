use std::path::{Path, PathBuf};
use tracing::info;
use crate::error::{file_access, Result};
use crate::util::ensure_dir;

/// Directory under the install path that `fmsmgr` reads its services from.
pub const SERVICES_DIR_NAME: &str = "services";

/// A fixed-content file in the services directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub content: String,
}

impl ServiceDescriptor {
    /// The two descriptors `fmsmgr` expects: `fms` names the directory the
    /// server binaries live in, `fmsadmin` names the companion admin service.
    pub fn defaults<P: AsRef<Path>>(install_path: P) -> [ServiceDescriptor; 2] {
        [
            ServiceDescriptor {
                name: "fms",
                content: install_path.as_ref().to_string_lossy().into_owned(),
            },
            ServiceDescriptor {
                name: "fmsadmin",
                content: "fms".to_string(),
            },
        ]
    }
}

pub fn services_dir<P: AsRef<Path>>(install_path: P) -> PathBuf {
    install_path.as_ref().join(SERVICES_DIR_NAME)
}

/// Creates `<install>/services` and (over)writes the service descriptors.
///
/// Returns the descriptor paths in the order they were written.
pub fn write_service_descriptors<P: AsRef<Path>>(install_path: P) -> Result<Vec<PathBuf>> {
    let dir = services_dir(&install_path);
    ensure_dir(&dir)?;

    let mut written = Vec::new();
    for descriptor in ServiceDescriptor::defaults(&install_path) {
        let path = dir.join(descriptor.name);
        std::fs::write(&path, &descriptor.content).map_err(file_access("write", &path))?;
        written.push(path);
    }
    info!("Wrote {} service descriptors to {}", written.len(), dir.display());
    Ok(written)
}
