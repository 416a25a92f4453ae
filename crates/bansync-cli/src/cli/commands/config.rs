//! `bansync config` - engine configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config;
use crate::output::OutputFormat;

pub fn execute(ctx: &Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Set { key, value } => set_config(ctx, &key, &value),
        ConfigCommands::Path => show_path(ctx),
        ConfigCommands::Init { force } => init_config(ctx, force),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = config::load_effective(&ctx.config_path)?;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Pretty => {
            let source = if ctx.config_path.exists() {
                ctx.config_path.display().to_string()
            } else {
                format!("{} (not created, showing defaults)", ctx.config_path.display())
            };
            println!("{} {}", "Configuration:".bold(), source.dimmed());
            println!();
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn set_config(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut settings = config::load(&ctx.config_path)?;
    config::set_value(&mut settings, key, value)?;
    config::save(&settings, &ctx.config_path)?;

    println!("{} {} set to {}.", "Success:".green().bold(), key, value.cyan());
    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_path.display());
    Ok(())
}

fn init_config(ctx: &Context, force: bool) -> Result<()> {
    if ctx.config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\nUse --force to overwrite it.",
            ctx.config_path.display()
        );
    }

    config::save(&bansync::SyncConfig::default(), &ctx.config_path)?;
    println!(
        "{} wrote defaults to {}",
        "Success:".green().bold(),
        ctx.config_path.display()
    );
    Ok(())
}
