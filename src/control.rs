use std::path::{Path, PathBuf};
use tracing::{info, warn};
use crate::error::{file_access, Result};
use crate::lock::LockedFile;
use crate::util::ensure_dir;

/// File name of the server's control script, in the install path and in the bin directory.
pub const CONTROL_SCRIPT_NAME: &str = "fmsmgr";

/// Services location compiled into the stock `fmsmgr`.
pub const DEFAULT_SERVICES_PATH: &str = "/etc/adobe/fms/services";

/// What [`patch_control_script`] did to the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPatch {
    /// The default services path was replaced this many times.
    Rewritten(usize),
    /// The default services path was not found; the script is untouched.
    Unchanged,
}

pub fn control_script_path<P: AsRef<Path>>(install_path: P) -> PathBuf {
    install_path.as_ref().join(CONTROL_SCRIPT_NAME)
}

/// Points the control script at `services_dir` instead of the system-wide default.
///
/// A script that no longer mentions the default path (already patched, or a
/// release that moved it) is left as is; in the second case a warning is
/// logged since the server will not find its services.
pub fn patch_control_script<P: AsRef<Path>, Q: AsRef<Path>>(script: P, services_dir: Q) -> Result<ScriptPatch> {
    let services_dir = services_dir.as_ref().to_string_lossy();
    let mut file = LockedFile::acquire(script.as_ref())?;
    let text = file.read_to_string()?;

    let count = text.matches(DEFAULT_SERVICES_PATH).count();
    if count == 0 {
        if text.contains(&*services_dir) {
            info!("{} already points at {services_dir}", file.path().display());
        } else {
            warn!(
                "{} does not reference {DEFAULT_SERVICES_PATH}; leaving it unchanged",
                file.path().display()
            );
        }
        return Ok(ScriptPatch::Unchanged);
    }

    file.replace_contents(&text.replace(DEFAULT_SERVICES_PATH, &services_dir))?;
    info!("Rewrote {count} services path(s) in {}", file.path().display());
    Ok(ScriptPatch::Rewritten(count))
}

/// Copies the control script into `bin_dir`, replacing any previous copy.
pub fn publish_control_script<P: AsRef<Path>, Q: AsRef<Path>>(script: P, bin_dir: Q) -> Result<PathBuf> {
    let (script, bin_dir) = (script.as_ref(), bin_dir.as_ref());
    ensure_dir(bin_dir)?;
    let target = bin_dir.join(CONTROL_SCRIPT_NAME);
    std::fs::copy(script, &target).map_err(file_access("copy", script))?;
    info!("Published {} to {}", script.display(), target.display());
    Ok(target)
}
