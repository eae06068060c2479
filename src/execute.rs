use std::path::Path;
use anyhow::{Context, Result};
use colored::Colorize;
use fms_recipe::global::utils::get_global_cache_dir;
use fms_recipe::{clean_cache, BuildoutSection, Installer, RecipeOptions, RecipePaths, RecipeToml, ScriptPatch};
use crate::cli::{LocationArgs, PartArgs, RecipeCommand, CLI};

pub fn execute(cli: CLI) -> Result<()> {
    match cli.command {
        RecipeCommand::Install(args) => {
            execute_install(&cli.config, args)
        }
        RecipeCommand::Update(args) => {
            execute_update(&cli.config, args)
        }
        RecipeCommand::Clean(locations) => {
            execute_clean(&cli.config, locations)
        }
    }
}

fn overrides(locations: LocationArgs) -> BuildoutSection {
    BuildoutSection {
        parts_directory: locations.parts_dir,
        bin_directory: locations.bin_dir,
        download_cache: locations.download_cache,
    }
}

fn load_part(config: &Path, args: PartArgs) -> Result<(RecipeOptions, RecipePaths)> {
    let recipe = RecipeToml::load(config)
        .with_context(|| format!("could not load recipe file {}", config.display()))?;
    let part = args
        .part
        .unwrap_or_else(|| recipe.default_part_name().to_string());
    let options = recipe.part_options(&part)?;
    let paths = recipe.paths(&part, &overrides(args.locations), get_global_cache_dir)?;
    Ok((options, paths))
}

pub fn execute_install(config: &Path, args: PartArgs) -> Result<()> {
    let (options, paths) = load_part(config, args)?;
    let part = paths.part_name.clone();
    let installer = Installer::new(&options, paths)?;
    let report = installer
        .install()
        .with_context(|| format!("install of part [{part}] failed"))?;

    let verb = if report.fresh_install() { "Installed" } else { "Reconfigured" };
    println!(
        "{} [{}] at {}",
        verb.green().bold(),
        part,
        report.package.install_path.display()
    );
    if report.script_patch == ScriptPatch::Unchanged && report.fresh_install() {
        println!("  {} control script did not reference the default services path", "warning:".yellow());
    }
    if let Some(link) = &report.library_link {
        println!("  linked {} -> {}", link.destination.display(), link.source.display());
    }
    println!("  control script: {}", report.published.display());
    Ok(())
}

pub fn execute_update(config: &Path, args: PartArgs) -> Result<()> {
    let (options, paths) = load_part(config, args)?;
    let part = paths.part_name.clone();
    let installer = Installer::new(&options, paths)?;
    let conf = installer
        .update()
        .with_context(|| format!("update of part [{part}] failed"))?;
    println!("{} [{}] {}", "Updated".green().bold(), part, conf.display());
    Ok(())
}

pub fn execute_clean(config: &Path, locations: LocationArgs) -> Result<()> {
    let cache_dir = match locations.download_cache {
        Some(dir) => dir,
        None => {
            let from_file = if config.exists() {
                RecipeToml::load(config)?.buildout.download_cache
            } else {
                None
            };
            match from_file {
                Some(dir) => dir,
                None => get_global_cache_dir()?,
            }
        }
    };
    let removed = clean_cache(&cache_dir)?;
    if removed.is_empty() {
        println!("Nothing to clean in {}", cache_dir.display());
    }
    for path in removed {
        println!("{} {}", "Removed".green().bold(), path.display());
    }
    Ok(())
}
