//! Configuration file – reads/writes `~/.teddy/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use teddy_runtime::prompt::DEFAULT_PERSONA;
use teddy_runtime::{
    FailedQueryPolicy, GrammarKind, RetryPolicy, SessionConfig, UnknownDirectivePolicy,
};
use thiserror::Error;

/// Errors raised while loading or saving the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persisted operator configuration stored in `~/.teddy/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint of the text-generation service.
    #[serde(default = "default_oracle_url")]
    pub oracle_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Oracle attempts per turn, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a failed request, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Shortest acceptable reply after sanitizing.
    #[serde(default = "default_min_response_chars")]
    pub min_response_chars: usize,

    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Previous exchanges included in each prompt.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    #[serde(default)]
    pub grammar: GrammarKind,

    /// Unset means the grammar's own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_directive: Option<UnknownDirectivePolicy>,

    #[serde(default)]
    pub failed_query: FailedQueryPolicy,

    /// How often `reuse_input` retries one utterance before listening again.
    #[serde(default = "default_max_input_reuses")]
    pub max_input_reuses: u32,

    /// Directory holding the numbered chat logs.
    #[serde(default = "default_chat_dir")]
    pub chat_dir: PathBuf,

    /// Address of the robot.  Informational only; shown at startup.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub robot_ip: String,

    /// Gesture played while the oracle is thinking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_gesture: Option<String>,

    #[serde(default = "default_persona")]
    pub persona: String,
}

fn default_oracle_url() -> String {
    "http://localhost:5000/generate".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    1000
}
fn default_min_response_chars() -> usize {
    10
}
fn default_max_input_reuses() -> u32 {
    1
}
fn default_max_turns() -> usize {
    13
}
fn default_context_window() -> usize {
    5
}
fn default_chat_dir() -> PathBuf {
    PathBuf::from("chats")
}
fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle_url: default_oracle_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            min_response_chars: default_min_response_chars(),
            max_turns: default_max_turns(),
            context_window: default_context_window(),
            grammar: GrammarKind::default(),
            unknown_directive: None,
            failed_query: FailedQueryPolicy::default(),
            max_input_reuses: default_max_input_reuses(),
            chat_dir: default_chat_dir(),
            robot_ip: String::new(),
            thinking_gesture: None,
            persona: default_persona(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Translate into the runtime's session settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_turns: self.max_turns,
            context_window: self.context_window,
            persona: self.persona.clone(),
            grammar: self.grammar,
            unknown_directive: self.unknown_directive,
            failed_query: self.failed_query,
            max_input_reuses: self.max_input_reuses,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff: Duration::from_millis(self.retry_backoff_ms),
                min_chars: self.min_response_chars,
            },
            chat_dir: Some(self.chat_dir.clone()),
            thinking_gesture: self.thinking_gesture.clone(),
            ..SessionConfig::default()
        }
    }
}

/// Return the path to `~/.teddy/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".teddy").join("config.toml")
}

/// Load the config from disk, with `TEDDY_*` overrides applied.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, ConfigError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(toml::from_str(&raw)?))
}

/// Apply `TEDDY_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TEDDY_ORACLE_URL` | `oracle_url` |
/// | `TEDDY_MAX_TURNS` | `max_turns` |
/// | `TEDDY_GRAMMAR` | `grammar` (`bracketed` or `delimited`) |
/// | `TEDDY_CHAT_DIR` | `chat_dir` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_with(cfg, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`], reading variables through `lookup`.
pub(crate) fn apply_overrides_with(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TEDDY_ORACLE_URL") {
        cfg.oracle_url = v;
    }
    if let Some(v) = lookup("TEDDY_MAX_TURNS")
        && let Ok(turns) = v.trim().parse::<usize>()
    {
        cfg.max_turns = turns;
    }
    if let Some(v) = lookup("TEDDY_GRAMMAR")
        && let Some(grammar) = parse_grammar(&v)
    {
        cfg.grammar = grammar;
    }
    if let Some(v) = lookup("TEDDY_CHAT_DIR") {
        cfg.chat_dir = PathBuf::from(v);
    }
}

/// Parse a grammar name as written in config or the environment.
pub fn parse_grammar(value: &str) -> Option<GrammarKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "bracketed" => Some(GrammarKind::Bracketed),
        "delimited" => Some(GrammarKind::Delimited),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.teddy/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
