use crate::dedupe::DedupeStrategy;
use log::{debug, trace};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_SAVE_DIR: &str = "Fetched_Images";
pub const DEFAULT_USER_AGENT: &str = "UbuntuImageFetcher/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// No cap on the response body unless one is configured
pub const DEFAULT_MAX_BYTES: u64 = u64::MAX;

/// Configuration loaded from file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub dir: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_bytes: Option<u64>,
    pub dedupe: Option<String>,
    pub strict: Option<bool>,
}

/// Resolved configuration with all sources merged
#[derive(Debug, Clone)]
pub struct Config {
    pub save_dir: PathBuf,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_bytes: u64,
    pub dedupe: DedupeStrategy,
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_bytes: DEFAULT_MAX_BYTES,
            dedupe: DedupeStrategy::Index,
            strict: false,
        }
    }
}

/// Get the default config file path ($XDG_CONFIG_HOME/imgfetch/config.toml on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_local_dir().map(|p| p.join("imgfetch").join("config.toml"))
}

/// Load configuration from a TOML file
pub fn load_config_file(path: &PathBuf) -> Option<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to read config file {:?}: {}", path, e);
            } else {
                trace!("No config file at {:?}", path);
            }
            None
        }
    }
}

/// Load a setting from environment variable
fn env_var(name: &str) -> Option<String> {
    let key = format!("IMGFETCH_{}", name.to_uppercase());
    std::env::var(&key).ok().map(|v| {
        trace!("Found env var {}={}", key, v);
        v
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_dedupe_strategy(s: &str) -> Option<DedupeStrategy> {
    match s.to_lowercase().as_str() {
        "index" => Some(DedupeStrategy::Index),
        "scan" => Some(DedupeStrategy::Scan),
        _ => {
            log::warn!("Unknown dedupe strategy '{}', expected index or scan", s);
            None
        }
    }
}

/// CLI argument values (None means not specified)
#[derive(Debug, Default)]
pub struct CliArgs {
    pub dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_bytes: Option<u64>,
    pub dedupe: Option<DedupeStrategy>,
    pub strict: Option<bool>,
}

impl Config {
    /// Build configuration with precedence: CLI > env vars > config file > defaults
    #[allow(clippy::field_reassign_with_default)]
    pub fn build(cli: CliArgs, config_path: Option<PathBuf>) -> Self {
        let mut config = Config::default();

        // Load config file (lowest priority after defaults)
        let file_config = config_path
            .or_else(default_config_path)
            .and_then(|p| load_config_file(&p))
            .unwrap_or_default();

        if let Some(v) = file_config.dir {
            config.save_dir = PathBuf::from(v);
        }
        if let Some(v) = file_config.user_agent {
            config.user_agent = v;
        }
        if let Some(v) = file_config.timeout_secs {
            config.timeout_secs = v;
        }
        if let Some(v) = file_config.max_bytes {
            config.max_bytes = v;
        }
        if let Some(v) = file_config.dedupe.and_then(|s| parse_dedupe_strategy(&s)) {
            config.dedupe = v;
        }
        if let Some(v) = file_config.strict {
            config.strict = v;
        }

        // Environment variables (higher priority than config file)
        if let Some(v) = env_var("dir") {
            config.save_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("user_agent") {
            config.user_agent = v;
        }
        if let Some(v) = env_var("timeout_secs").and_then(|s| s.parse().ok()) {
            config.timeout_secs = v;
        }
        if let Some(v) = env_var("max_bytes").and_then(|s| s.parse().ok()) {
            config.max_bytes = v;
        }
        if let Some(v) = env_var("dedupe").and_then(|s| parse_dedupe_strategy(&s)) {
            config.dedupe = v;
        }
        if let Some(v) = env_var("strict").and_then(|s| parse_bool(&s)) {
            config.strict = v;
        }

        // CLI arguments (highest priority)
        if let Some(v) = cli.dir {
            config.save_dir = v;
        }
        if let Some(v) = cli.user_agent {
            config.user_agent = v;
        }
        if let Some(v) = cli.timeout_secs {
            config.timeout_secs = v;
        }
        if let Some(v) = cli.max_bytes {
            config.max_bytes = v;
        }
        if let Some(v) = cli.dedupe {
            config.dedupe = v;
        }
        if let Some(v) = cli.strict {
            config.strict = v;
        }

        config
    }
}
