//! `llmgate status`: show configuration and backend status.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use llmgate_backends::BackendRegistry;
use llmgate_core::config::{get_config_path, load_config};
use llmgate_core::utils::expand_home;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let config = load_config(Some(&path));

    println!();
    println!("{}", "⚡ llmgate status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    println!(
        "  {:<18} {}:{}",
        "Listen:".bold(),
        config.server.host,
        config.server.port
    );

    let scratch = expand_home(&config.server.scratch_dir);
    println!(
        "  {:<18} {} {}",
        "Scratch dir:".bold(),
        scratch.display(),
        if scratch.exists() {
            "✓".green().to_string()
        } else {
            "(created on serve)".dimmed().to_string()
        }
    );

    println!(
        "  {:<18} {}",
        "Polling:".bold(),
        format!(
            "every {} ms, up to {} attempts",
            config.polling.interval_ms, config.polling.max_attempts
        )
        .dimmed()
    );

    let openai = if config.providers.openai.is_configured() {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", "· not configured".dimmed())
    };
    println!("  {:<18} {}", "OpenAI:".bold(), openai);

    println!();
    println!("  {}", "Backends:".bold());
    match BackendRegistry::from_config(&config) {
        Ok(registry) if registry.is_empty() => {
            println!("    {}", "(none registered)".dimmed());
        }
        Ok(registry) => {
            for (name, kind) in registry.entries() {
                println!("    {:<24} {}", name, kind.as_str().dimmed());
            }
        }
        Err(e) => {
            println!("    {} {}", "✗".red(), e);
        }
    }

    println!();

    Ok(())
}
