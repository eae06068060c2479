//! # fms-recipe Core Library
//!
//! This crate installs and configures a Flash Media Server release as one
//! part of a declarative host-provisioning run. It fetches the release archive
//! once, unpacks it into the part's install location, adapts the server's
//! control script and `fms.ini` to the host, links a missing `libcap`, and
//! publishes the control script to a shared bin directory.
//!
//! Every configuration step is idempotent: running `install` again against an
//! existing install location skips the download and only re-applies
//! configuration; `update` re-applies `fms.ini` alone.
//!
//! ## Modules Overview
//! - [`recipe`] – Parsing of the TOML recipe file (`[buildout]` + parts)
//! - [`config`] – Option validation and the resolved, immutable [`InstallConfig`]
//! - [`global`] – The download cache and per-user default directories
//! - [`extract`] – Unpacking the release and relocating its package root
//! - [`services`] – Service descriptor files read by `fmsmgr`
//! - [`control`] – Patching and publishing the `fmsmgr` control script
//! - [`ini`] – Directive upserts into `fms.ini`
//! - [`linker`] – Linking `libcap` from the host's linker cache
//! - [`installer`] – The `install`/`update` orchestration
//! - [`lock`] – Exclusive locks around read-modify-write of patched files
//! - [`error`] – The [`RecipeError`] taxonomy

pub mod config;
pub mod control;
pub mod error;
pub mod extract;
pub mod global;
pub mod ini;
pub mod installer;
pub mod linker;
pub mod lock;
pub mod recipe;
pub mod services;
pub mod util;

pub use config::*;
pub use control::*;
pub use error::{RecipeError, Result};
pub use extract::*;
pub use global::cache::*;
pub use ini::*;
pub use installer::*;
pub use linker::*;
pub use recipe::*;
pub use services::*;
