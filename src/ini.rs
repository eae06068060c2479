//! Directive upserts for the server's `fms.ini`.
//!
//! `fms.ini` is a flat list of `KEY = VALUE` lines with `#` comments. Rather
//! than parsing it into a map and serializing it back (which would lose
//! comments, ordering and spacing), the document is kept as its original
//! lines and only the lines carrying a touched key are rewritten.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use crate::config::InstallConfig;
use crate::error::Result;
use crate::lock::LockedFile;

/// Name of the configuration file inside `<install>/conf`.
pub const CONFIG_FILE_NAME: &str = "fms.ini";

/// The text of a configuration file, held line by line.
///
/// Each stored line keeps its own terminator (`\n`, `\r\n`, or none for a
/// final unterminated line), so rendering an untouched document reproduces
/// the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<String>,
    applied: Vec<String>,
}

impl ConfigDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
            applied: Vec::new(),
        }
    }

    /// Sets `key` to `value`.
    ///
    /// The first directive line carrying `key` is rewritten in place to the
    /// canonical `KEY = VALUE` form and any later duplicates are dropped. If
    /// the key is not present, the canonical line is appended at the end.
    pub fn upsert(&mut self, key: &str, value: &str) {
        let canonical = format!("{key} = {value}");
        let mut found = false;
        self.lines.retain_mut(|line| {
            if directive_key(line) != Some(key) {
                return true;
            }
            if found {
                return false;
            }
            found = true;
            let terminator = line_terminator(line);
            *line = format!("{canonical}{terminator}");
            true
        });

        if !found {
            if let Some(last) = self.lines.last_mut() {
                if line_terminator(last).is_empty() {
                    last.push('\n');
                }
            }
            self.lines.push(format!("{canonical}\n"));
        }

        self.applied.retain(|k| k != key);
        self.applied.push(key.to_string());
    }

    /// Returns the value of the first directive line carrying `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| directive_key(line) == Some(key))
            .and_then(|line| line.split_once('='))
            .map(|(_, value)| value.trim())
    }

    /// Keys upserted on this document, in the order they were last applied.
    pub fn applied_keys(&self) -> &[String] {
        &self.applied
    }

    pub fn render(&self) -> String {
        self.lines.concat()
    }
}

/// Returns the key of a `KEY = VALUE` line, or `None` for comments, section
/// headers, blank lines and anything else.
fn directive_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let (key, _) = trimmed.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some(key)
}

fn line_terminator(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

/// Path of `fms.ini` for an install location.
pub fn config_path<P: AsRef<Path>>(install_path: P) -> PathBuf {
    install_path.as_ref().join("conf").join(CONFIG_FILE_NAME)
}

/// Applies every directive of `config` to the file at `conf_path`.
///
/// The file is locked, read once, patched in memory and written back once.
/// An unreadable file fails before any key is applied.
pub fn apply_directives<P: AsRef<Path>>(conf_path: P, config: &InstallConfig) -> Result<ConfigDocument> {
    let mut file = LockedFile::acquire(conf_path.as_ref())?;
    let mut document = ConfigDocument::parse(&file.read_to_string()?);

    for (key, value) in config.directives() {
        debug!("Setting {key} in {}", file.path().display());
        document.upsert(key, &value);
    }

    file.replace_contents(&document.render())?;
    info!(
        "Applied {} directives to {}",
        document.applied_keys().len(),
        file.path().display()
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Flash Media Server configuration\n\
SERVER.ADMIN_USERNAME = \n\
SERVER.ADMINSERVER_HOSTPORT = :1111\n\
\n\
# adaptor\n\
ADAPTOR.HOSTPORT = :1935,80\n";

    #[test]
    fn test_upsert_replaces_existing_value_in_place() {
        let mut doc = ConfigDocument::parse(SAMPLE);
        doc.upsert("SERVER.ADMIN_USERNAME", "admin");

        let rendered = doc.render();
        assert_eq!(rendered, SAMPLE.replace("SERVER.ADMIN_USERNAME = \n", "SERVER.ADMIN_USERNAME = admin\n"));
        assert_eq!(doc.get("SERVER.ADMIN_USERNAME"), Some("admin"));
    }

    #[test]
    fn test_upsert_appends_missing_key() {
        let mut doc = ConfigDocument::parse(SAMPLE);
        doc.upsert("LIVE_DIR", "/opt/fms/live");

        let rendered = doc.render();
        assert!(rendered.starts_with(SAMPLE));
        assert_eq!(rendered.len(), SAMPLE.len() + "LIVE_DIR = /opt/fms/live\n".len());
        assert!(rendered.ends_with("\nLIVE_DIR = /opt/fms/live\n"));
    }

    #[test]
    fn test_upsert_appends_after_unterminated_last_line() {
        let mut doc = ConfigDocument::parse("VOD_DIR = /old");
        doc.upsert("LIVE_DIR", "/live");
        assert_eq!(doc.render(), "VOD_DIR = /old\nLIVE_DIR = /live\n");
    }

    #[test]
    fn test_upsert_into_empty_document() {
        let mut doc = ConfigDocument::parse("");
        doc.upsert("LOGGER.LOGDIR", "");
        assert_eq!(doc.render(), "LOGGER.LOGDIR = \n");
    }

    #[test]
    fn test_upsert_twice_keeps_last_value_once() {
        let mut doc = ConfigDocument::parse(SAMPLE);
        doc.upsert("SERVER.PROCESS_UID", "1000");
        doc.upsert("SERVER.PROCESS_UID", "2000");

        let rendered = doc.render();
        assert_eq!(rendered.matches("SERVER.PROCESS_UID").count(), 1);
        assert!(rendered.contains("SERVER.PROCESS_UID = 2000\n"));

        let mut again = ConfigDocument::parse(&rendered);
        again.upsert("SERVER.PROCESS_UID", "2000");
        assert_eq!(again.render(), rendered);
    }

    #[test]
    fn test_upsert_collapses_duplicate_lines() {
        let text = "VOD_DIR = a\nLIVE_DIR = x\nVOD_DIR = b\n";
        let mut doc = ConfigDocument::parse(text);
        doc.upsert("VOD_DIR", "c");
        assert_eq!(doc.render(), "VOD_DIR = c\nLIVE_DIR = x\n");
    }

    #[test]
    fn test_prefix_key_does_not_match_longer_key() {
        let text = "VOD_DIR = /media\nVOD_DIR_EXTRA = keep\n";
        let mut doc = ConfigDocument::parse(text);
        doc.upsert("VOD_DIR", "/srv/media");
        assert_eq!(doc.render(), "VOD_DIR = /srv/media\nVOD_DIR_EXTRA = keep\n");
    }

    #[test]
    fn test_comments_and_crlf_are_preserved() {
        let text = "# VOD_DIR = commented\r\nVOD_DIR=/media\r\n";
        let mut doc = ConfigDocument::parse(text);
        doc.upsert("VOD_DIR", "/srv");
        assert_eq!(doc.render(), "# VOD_DIR = commented\r\nVOD_DIR = /srv\r\n");
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut doc = ConfigDocument::parse("live_dir = /x\n");
        doc.upsert("LIVE_DIR", "/y");
        assert_eq!(doc.render(), "live_dir = /x\nLIVE_DIR = /y\n");
    }

    #[test]
    fn test_applied_keys_track_last_application_order() {
        let mut doc = ConfigDocument::parse("");
        doc.upsert("A", "1");
        doc.upsert("B", "2");
        doc.upsert("A", "3");
        assert_eq!(doc.applied_keys(), &["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_config_path() {
        assert_eq!(config_path("/opt/fms"), PathBuf::from("/opt/fms/conf/fms.ini"));
    }
}
