//! `llmgate init`: write the default configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use llmgate_core::config::{get_config_path, save_config, Config};

pub fn run(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(get_config_path);

    println!();
    if write_default(&path, force)? {
        println!("  {} created config at {}", "✓".green(), path.display());
        println!(
            "  {}",
            "Set providers.openai.apiKey (or OPENAI_API_KEY) before declaring OpenAI backends."
                .dimmed()
        );
    } else {
        println!(
            "  {} config already exists at {} (use --force to overwrite)",
            "✓".green(),
            path.display()
        );
    }
    println!();

    Ok(())
}

/// Write `Config::default()` to `path`. Returns `false` when a file already
/// exists and `force` is off.
fn write_default(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    Ok(true)
}
