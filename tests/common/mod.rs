#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use flate2::write::GzEncoder;
use flate2::Compression;
use fms_recipe::RecipeOptions;

pub const STOCK_INI: &str = "###############################################\n\
# Flash Media Server configuration\n\
###############################################\n\
SERVER.ADMIN_USERNAME = \n\
SERVER.ADMIN_PASSWORD = \n\
SERVER.ADMINSERVER_HOSTPORT = :1111\n\
SERVER.PROCESS_UID = \n\
SERVER.PROCESS_GID = \n\
SERVER.LICENSEINFO = \n\
SERVER.HTTPD_ENABLED = true\n\
USERS.HTTPCOMMAND_ALLOW = true\n\
\n\
ADAPTOR.HOSTPORT = :1935,80\n\
LIVE_DIR = /opt/adobe/fms/applications/live\n\
VOD_COMMON_DIR = /opt/adobe/fms/applications/vod/media\n\
VOD_DIR = /opt/adobe/fms/applications/vod/media\n\
VHOST.APPSDIR = /opt/adobe/fms/applications\n\
APP.JS_SCRIPTLIBPATH = /opt/adobe/fms/scriptlib\n\
LOGGER.LOGDIR = \n";

pub const STOCK_FMSMGR: &str = "#!/bin/sh\n\
SERVICES_DIR=/etc/adobe/fms/services\n\
cat $SERVICES_DIR/fms\n";

/// Writes a release tarball whose single root is `root`.
pub fn write_release(path: &Path, root: &str) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data, mode) in [
        ("conf/fms.ini", STOCK_INI, 0o644),
        ("fmsmgr", STOCK_FMSMGR, 0o755),
        ("fmsmaster", "binary", 0o755),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{root}/{name}"), data.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// A complete option set for part `fms`.
pub fn options(download_url: &str) -> RecipeOptions {
    RecipeOptions::new("fms")
        .with("download_url", download_url)
        .with("admin_username", "admin")
        .with("admin_password", "secret")
        .with("adminserver_interface", "127.0.0.1")
        .with("adminserver_hostport", 1111)
        .with("process_uid", 1000)
        .with("process_gid", 1000)
        .with("licenseinfo", "")
        .with("httpd_enabled", "False")
        .with("interface", "0.0.0.0")
        .with("hostport", 1935)
}

/// Counts lines whose key is exactly `key`.
pub fn count_directive(ini: &str, key: &str) -> usize {
    ini.lines()
        .filter(|line| line.split_once('=').map(|(k, _)| k.trim()) == Some(key))
        .count()
}
