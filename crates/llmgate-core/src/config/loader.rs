//! Config loader: `~/.llmgate/config.json` plus environment overrides.
//!
//! # Precedence (lowest first)
//! 1. `Config::default()`
//! 2. The JSON file (`~/.llmgate/config.json` or an explicit path)
//! 3. `LLMGATE_<SECTION>__<FIELD>` environment variables
//! 4. `OPENAI_API_KEY`, only when 2 and 3 left the key empty
//!
//! [`try_load_config`] fails on a file that exists but cannot be used;
//! [`load_config`] falls back to defaults instead.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the config lives when no path is given.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load the configuration from `path` (or [`get_config_path`]) and apply
/// environment overrides.
///
/// A missing file means defaults. An unreadable or malformed file is an
/// error. Completeness is checked later by [`Config::validate`].
pub fn try_load_config(path: Option<&Path>) -> Result<Config, LoadError> {
    let path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let base = read_config_file(&path)?.unwrap_or_default();
    Ok(apply_env_overrides(base))
}

/// Like [`try_load_config`], but a broken file is logged and replaced by defaults.
pub fn load_config(path: Option<&Path>) -> Config {
    try_load_config(path).unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        apply_env_overrides(Config::default())
    })
}

fn read_config_file(path: &Path) -> Result<Option<Config>, LoadError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(None);
        }
        Err(source) => {
            return Err(LoadError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let config = serde_json::from_str::<Config>(&raw).map_err(|source| LoadError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

/// Write `config` as pretty camelCase JSON, creating parent directories.
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let body = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(&path, body)?;
    debug!(path = %path.display(), "config written");
    Ok(())
}

// ─────────────────────────────────────────────
// Environment overrides
// ─────────────────────────────────────────────

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Unparseable values are ignored with a warning.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env_string(key).map(|raw| parse_bool(&raw))
}

/// Overrides, by section:
/// - server: `HOST`, `PORT`, `SCRATCH_DIR`
/// - providers: `OPENAI__API_KEY`, `OPENAI__API_BASE`
/// - backends: `CANNED`, `QINGYUNKE__ENABLED`
/// - polling: `INTERVAL_MS`, `MAX_ATTEMPTS`, `UPLOAD_ATTEMPTS`
/// - logging: `LEVEL`, `JSON`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Some(host) = env_string("LLMGATE_SERVER__HOST") {
        config.server.host = host;
    }
    if let Some(port) = env_parse("LLMGATE_SERVER__PORT") {
        config.server.port = port;
    }
    if let Some(dir) = env_string("LLMGATE_SERVER__SCRATCH_DIR") {
        config.server.scratch_dir = dir;
    }

    override_provider(&mut config.providers.openai, "OPENAI");
    if !config.providers.openai.is_configured() {
        if let Some(key) = env_string("OPENAI_API_KEY") {
            config.providers.openai.api_key = key;
        }
    }

    if let Some(on) = env_flag("LLMGATE_BACKENDS__CANNED") {
        config.backends.canned = on;
    }
    if let Some(on) = env_flag("LLMGATE_BACKENDS__QINGYUNKE__ENABLED") {
        config.backends.qingyunke.enabled = on;
    }

    if let Some(ms) = env_parse("LLMGATE_POLLING__INTERVAL_MS") {
        config.polling.interval_ms = ms;
    }
    if let Some(n) = env_parse("LLMGATE_POLLING__MAX_ATTEMPTS") {
        config.polling.max_attempts = n;
    }
    if let Some(n) = env_parse("LLMGATE_POLLING__UPLOAD_ATTEMPTS") {
        config.polling.upload_attempts = n;
    }

    if let Some(level) = env_string("LLMGATE_LOGGING__LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env_flag("LLMGATE_LOGGING__JSON") {
        config.logging.json = json;
    }

    config
}

fn override_provider(provider: &mut ProviderConfig, name: &str) {
    if let Some(key) = env_string(&format!("LLMGATE_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = key;
    }
    if let Some(base) = env_string(&format!("LLMGATE_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(base);
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config_file(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.json")));
        assert_eq!(config.polling.max_attempts, 120);
        assert!(config.backends.canned);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(
            &dir,
            r#"{
                "backends": {
                    "assistants": {
                        "gpt4o": { "assistantId": "asst_abc", "modelUsed": "gpt-4o" }
                    }
                },
                "polling": { "intervalMs": 250 }
            }"#,
        );

        let config = load_config(Some(&path));
        let gpt4o = &config.backends.assistants["gpt4o"];
        assert_eq!(gpt4o.assistant_id, "asst_abc");
        assert_eq!(gpt4o.model_used.as_deref(), Some("gpt-4o"));
        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.polling.upload_attempts, 3);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir, "{ \"server\": ");
        assert_eq!(load_config(Some(&path)).polling.max_attempts, 120);
    }

    #[test]
    fn strict_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir, "{ \"server\": ");

        let err = try_load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn strict_load_rejects_wrong_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file(&dir, r#"{ "server": { "port": "eighty" } }"#);
        assert!(matches!(
            try_load_config(Some(&path)),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn strict_load_accepts_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = try_load_config(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.polling.upload_attempts, 3);
    }

    #[test]
    fn strict_load_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            try_load_config(Some(dir.path())),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("config.json");

        let mut config = Config::default();
        config.server.scratch_dir = "/srv/gate/scratch".to_string();
        config.logging.buffer_lines = 42;
        save_config(&config, Some(&path)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["polling"].get("uploadAttempts").is_some());
        assert!(raw["polling"].get("upload_attempts").is_none());

        let reloaded = read_config_file(&path).unwrap().unwrap();
        assert_eq!(reloaded.server.scratch_dir, "/srv/gate/scratch");
        assert_eq!(reloaded.logging.buffer_lines, 42);
    }

    #[test]
    fn env_sets_port() {
        std::env::set_var("LLMGATE_SERVER__PORT", "9999");
        let config = apply_env_overrides(Config::default());
        std::env::remove_var("LLMGATE_SERVER__PORT");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn env_sets_provider_base() {
        std::env::set_var("LLMGATE_PROVIDERS__OPENAI__API_BASE", "http://localhost:9/v1");
        let config = apply_env_overrides(Config::default());
        std::env::remove_var("LLMGATE_PROVIDERS__OPENAI__API_BASE");
        assert_eq!(
            config.providers.openai.api_base.as_deref(),
            Some("http://localhost:9/v1")
        );
    }

    #[test]
    fn env_garbage_is_ignored() {
        std::env::set_var("LLMGATE_POLLING__MAX_ATTEMPTS", "lots");
        let config = apply_env_overrides(Config::default());
        std::env::remove_var("LLMGATE_POLLING__MAX_ATTEMPTS");
        assert_eq!(config.polling.max_attempts, 120);
    }

    #[test]
    fn bool_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" TRUE "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool("0"));
    }
}
