//! Shared CLI helpers: logging setup, version banner.

use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use llmgate_core::config::LoggingConfig;
use llmgate_gateway::RecentLogs;

const WORKSPACE_CRATES: [&str; 4] = [
    "llmgate",
    "llmgate_core",
    "llmgate_backends",
    "llmgate_gateway",
];

/// Filter directive used when `RUST_LOG` is unset.
fn default_directive(level: &str, verbose: bool) -> String {
    if verbose {
        let mut directives: Vec<String> = WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{krate}=debug"))
            .collect();
        directives.push("info".to_string());
        directives.join(",")
    } else if level.trim().is_empty() {
        "info".to_string()
    } else {
        level.trim().to_string()
    }
}

/// Initialize tracing and return the buffer behind `/api/v1/logs`.
///
/// `RUST_LOG` wins over both `--logs` and the configured level.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> RecentLogs {
    let logs = RecentLogs::new(config.buffer_lines);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level, verbose)));

    let registry = tracing_subscriber::registry().with(filter).with(logs.clone());
    if config.json {
        registry.with(fmt::layer().json().with_target(false)).init();
    } else {
        registry.with(fmt::layer().with_target(false).compact()).init();
    }

    logs
}

/// Print the startup banner.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "⚡ llmgate".cyan().bold(), version.dimmed());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
