use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use crate::error::{file_access, RecipeError, Result};

/// Options every part must define.
pub const REQUIRED_OPTIONS: [&str; 11] = [
    "download_url",
    "admin_username",
    "admin_password",
    "adminserver_interface",
    "adminserver_hostport",
    "process_uid",
    "process_gid",
    "licenseinfo",
    "httpd_enabled",
    "interface",
    "hostport",
];

/// The raw option dictionary of one recipe part.
///
/// Values are kept as text, the way the provisioning framework hands them
/// over; typing and defaulting happen once in [`InstallConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeOptions {
    part: String,
    values: BTreeMap<String, String>,
}

impl RecipeOptions {
    pub fn new(part: &str) -> Self {
        Self {
            part: part.to_string(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert, handy for tests and callers without a recipe file.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Converts a TOML table into options, stringifying scalar values.
    ///
    /// Arrays, tables and datetimes are rejected: the framework only ever
    /// passes flat strings.
    pub fn from_table(part: &str, table: &toml::Table) -> Result<Self> {
        let mut options = Self::new(part);
        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(RecipeError::Config(format!(
                        "option `{key}` in part [{part}] must be a string, number or boolean, found {}",
                        other.type_str()
                    )));
                }
            };
            options.values.insert(key.clone(), text);
        }
        Ok(options)
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| RecipeError::MissingConfigKey {
            part: self.part.clone(),
            key: key.to_string(),
        })
    }

    /// Every value ends up on a single `fms.ini` line, so none may span lines.
    fn reject_line_breaks(&self) -> Result<()> {
        match self.values.iter().find(|(_, value)| value.contains(['\n', '\r'])) {
            Some((key, _)) => Err(RecipeError::Config(format!(
                "option `{key}` in part [{}] must not contain a line break",
                self.part
            ))),
            None => Ok(()),
        }
    }
}

/// Locations supplied by the provisioning framework for one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipePaths {
    pub part_name: String,
    pub parts_directory: PathBuf,
    pub bin_directory: PathBuf,
    pub download_cache: PathBuf,
}

impl RecipePaths {
    /// `<parts-directory>/<part-name>`, made absolute against the current directory.
    pub fn install_location(&self) -> Result<PathBuf> {
        let location = self.parts_directory.join(&self.part_name);
        std::path::absolute(&location).map_err(file_access("resolve", &location))
    }
}

/// Server directories written into `fms.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    pub live_dir: String,
    pub vod_common_dir: String,
    pub vod_dir: String,
    pub appsdir: String,
    pub js_scriptlibpath: String,
    /// Empty unless configured; the server then logs to its own `logs` dir.
    pub log_dir: String,
}

impl Directories {
    fn resolve(options: &RecipeOptions, install_path: &Path) -> Self {
        let under = |key: &str, default: &str| {
            options
                .get(key)
                .map(str::to_string)
                .unwrap_or_else(|| install_path.join(default).to_string_lossy().into_owned())
        };
        Self {
            live_dir: under("live_dir", "live"),
            vod_common_dir: under("vod_common_dir", "vod"),
            vod_dir: under("vod_dir", "media"),
            appsdir: under("appsdir", "applications"),
            js_scriptlibpath: under("js_scriptlibpath", "scriptlib"),
            log_dir: options.get("log_dir").unwrap_or_default().to_string(),
        }
    }
}

/// Fully resolved, immutable configuration for one install location.
#[derive(Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub install_path: PathBuf,
    pub download_url: String,
    /// Expected SHA-256 of the release archive, lowercase hex.
    pub download_sha256: Option<String>,
    pub admin_username: String,
    pub admin_password: String,
    pub adminserver_interface: String,
    pub adminserver_hostport: String,
    pub process_uid: String,
    pub process_gid: String,
    pub licenseinfo: String,
    /// Normalized to lowercase (`true`/`false`).
    pub httpd_enabled: String,
    pub interface: String,
    pub hostport: String,
    pub directories: Directories,
}

impl InstallConfig {
    /// Validates the required options and computes every default relative to
    /// `install_path`. Fails with the first missing key before anything
    /// touches the disk.
    pub fn resolve<P: AsRef<Path>>(options: &RecipeOptions, install_path: P) -> Result<Self> {
        let install_path = install_path.as_ref().to_path_buf();
        for key in REQUIRED_OPTIONS {
            options.require(key)?;
        }
        options.reject_line_breaks()?;
        let text = |key: &str| options.require(key).map(str::to_string);

        Ok(Self {
            download_url: text("download_url")?,
            download_sha256: options
                .get("download_sha256")
                .map(|hash| hash.trim().to_ascii_lowercase())
                .filter(|hash| !hash.is_empty()),
            admin_username: text("admin_username")?,
            admin_password: text("admin_password")?,
            adminserver_interface: text("adminserver_interface")?,
            adminserver_hostport: text("adminserver_hostport")?,
            process_uid: text("process_uid")?,
            process_gid: text("process_gid")?,
            licenseinfo: text("licenseinfo")?,
            httpd_enabled: text("httpd_enabled")?.to_lowercase(),
            interface: text("interface")?,
            hostport: text("hostport")?,
            directories: Directories::resolve(options, &install_path),
            install_path,
        })
    }

    /// The `fms.ini` directives in the order they are applied.
    pub fn directives(&self) -> Vec<(&'static str, String)> {
        let dirs = &self.directories;
        vec![
            ("SERVER.ADMIN_USERNAME", self.admin_username.clone()),
            ("SERVER.ADMIN_PASSWORD", self.admin_password.clone()),
            (
                "SERVER.ADMINSERVER_HOSTPORT",
                host_port(&self.adminserver_interface, &self.adminserver_hostport),
            ),
            ("SERVER.PROCESS_UID", self.process_uid.clone()),
            ("SERVER.PROCESS_GID", self.process_gid.clone()),
            ("SERVER.LICENSEINFO", self.licenseinfo.clone()),
            ("SERVER.HTTPD_ENABLED", self.httpd_enabled.clone()),
            ("ADAPTOR.HOSTPORT", host_port(&self.interface, &self.hostport)),
            ("LIVE_DIR", dirs.live_dir.clone()),
            ("VOD_COMMON_DIR", dirs.vod_common_dir.clone()),
            ("VOD_DIR", dirs.vod_dir.clone()),
            ("VHOST.APPSDIR", dirs.appsdir.clone()),
            ("APP.JS_SCRIPTLIBPATH", dirs.js_scriptlibpath.clone()),
            ("LOGGER.LOGDIR", dirs.log_dir.clone()),
        ]
    }
}

impl fmt::Debug for InstallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallConfig")
            .field("install_path", &self.install_path)
            .field("download_url", &self.download_url)
            .field("download_sha256", &self.download_sha256)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"[REDACTED]")
            .field("adminserver_interface", &self.adminserver_interface)
            .field("adminserver_hostport", &self.adminserver_hostport)
            .field("process_uid", &self.process_uid)
            .field("process_gid", &self.process_gid)
            .field("licenseinfo", &self.licenseinfo)
            .field("httpd_enabled", &self.httpd_enabled)
            .field("interface", &self.interface)
            .field("hostport", &self.hostport)
            .field("directories", &self.directories)
            .finish()
    }
}

fn host_port(interface: &str, port: &str) -> String {
    format!("{interface}:{port}")
}

#[cfg(test)]
pub(crate) fn sample_options() -> RecipeOptions {
    RecipeOptions::new("fms")
        .with("download_url", "http://example/fms.tgz")
        .with("admin_username", "admin")
        .with("admin_password", "secret")
        .with("adminserver_interface", "127.0.0.1")
        .with("adminserver_hostport", 1111)
        .with("process_uid", 1000)
        .with("process_gid", 1000)
        .with("licenseinfo", "")
        .with("httpd_enabled", "True")
        .with("interface", "0.0.0.0")
        .with("hostport", 1935)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_directories_under_install_path() {
        let config = InstallConfig::resolve(&sample_options(), "/opt/parts/fms").unwrap();
        let dirs = &config.directories;
        assert_eq!(dirs.live_dir, "/opt/parts/fms/live");
        assert_eq!(dirs.vod_common_dir, "/opt/parts/fms/vod");
        assert_eq!(dirs.vod_dir, "/opt/parts/fms/media");
        assert_eq!(dirs.appsdir, "/opt/parts/fms/applications");
        assert_eq!(dirs.js_scriptlibpath, "/opt/parts/fms/scriptlib");
        assert_eq!(dirs.log_dir, "");
    }

    #[test]
    fn test_resolve_keeps_overrides() {
        let options = sample_options()
            .with("vod_dir", "/srv/media")
            .with("log_dir", "/var/log/fms");
        let config = InstallConfig::resolve(&options, "/opt/parts/fms").unwrap();
        assert_eq!(config.directories.vod_dir, "/srv/media");
        assert_eq!(config.directories.log_dir, "/var/log/fms");
        assert_eq!(config.directories.live_dir, "/opt/parts/fms/live");
    }

    #[test]
    fn test_resolve_missing_key_names_part_and_key() {
        let mut options = RecipeOptions::new("media");
        for key in REQUIRED_OPTIONS.iter().filter(|k| **k != "process_gid") {
            options.insert(key, "x");
        }
        let err = InstallConfig::resolve(&options, "/opt/parts/media").unwrap_err();
        match err {
            RecipeError::MissingConfigKey { part, key } => {
                assert_eq!(part, "media");
                assert_eq!(key, "process_gid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_rejects_multiline_values() {
        for value in ["secret\nSERVER.ADMIN_USERNAME = root", "secret\r"] {
            let options = sample_options().with("admin_password", value);
            let err = InstallConfig::resolve(&options, "/opt/parts/fms").unwrap_err();
            match err {
                RecipeError::Config(message) => {
                    assert!(message.contains("`admin_password`"));
                    assert!(message.contains("[fms]"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        let options = sample_options().with("log_dir", "/var/log\n/fms");
        assert!(matches!(
            InstallConfig::resolve(&options, "/opt/parts/fms"),
            Err(RecipeError::Config(_))
        ));
    }

    #[test]
    fn test_directives_order_and_composites() {
        let config = InstallConfig::resolve(&sample_options(), "/opt/parts/fms").unwrap();
        let directives = config.directives();
        assert_eq!(directives.len(), 14);
        assert_eq!(directives[0], ("SERVER.ADMIN_USERNAME", "admin".to_string()));
        assert_eq!(directives[2], ("SERVER.ADMINSERVER_HOSTPORT", "127.0.0.1:1111".to_string()));
        assert_eq!(directives[6], ("SERVER.HTTPD_ENABLED", "true".to_string()));
        assert_eq!(directives[7], ("ADAPTOR.HOSTPORT", "0.0.0.0:1935".to_string()));
        assert_eq!(directives[13], ("LOGGER.LOGDIR", String::new()));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = InstallConfig::resolve(&sample_options(), "/opt/parts/fms").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_table_stringifies_scalars() {
        let table: toml::Table = toml::from_str("hostport = 1935\nhttpd_enabled = false\ninterface = \"0.0.0.0\"").unwrap();
        let options = RecipeOptions::from_table("fms", &table).unwrap();
        assert_eq!(options.get("hostport"), Some("1935"));
        assert_eq!(options.get("httpd_enabled"), Some("false"));
        assert_eq!(options.get("interface"), Some("0.0.0.0"));
    }

    #[test]
    fn test_from_table_rejects_arrays() {
        let table: toml::Table = toml::from_str("hostport = [1935, 80]").unwrap();
        assert!(matches!(
            RecipeOptions::from_table("fms", &table),
            Err(RecipeError::Config(_))
        ));
    }

    #[test]
    fn test_install_location_joins_part_name() {
        let paths = RecipePaths {
            part_name: "fms".to_string(),
            parts_directory: PathBuf::from("/srv/parts"),
            bin_directory: PathBuf::from("/srv/bin"),
            download_cache: PathBuf::from("/srv/downloads"),
        };
        assert_eq!(paths.install_location().unwrap(), PathBuf::from("/srv/parts/fms"));
    }
}
