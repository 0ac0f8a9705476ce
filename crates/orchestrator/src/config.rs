//! Orchestrator configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TOOL_REGISTRY_PATH` - YAML tool registry replacing the built-in one
//! - `<TOOL_NAME>_URL` - Endpoint override per registered tool, e.g.
//!   `NOTE_MAKER_URL`, `FLASHCARD_GENERATOR_URL`, `CONCEPT_EXPLAINER_URL`
//! - `TOOL_TIMEOUT_SECS` - Timeout for each tool call (default: 30)
//! - `CLAUDE_API_KEY` - Anthropic API key; enables the model fallbacks
//! - `CLAUDE_MODEL` - Claude model ID (default: claude-3-5-haiku-latest)
//! - `CLAUDE_TIMEOUT_SECS` - Timeout for each model call (default: 20)
//! - `SESSION_TTL_SECS` - Idle expiry of in-memory sessions (default: 7200)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::schema::{SchemaError, ToolRegistry};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLAUDE_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SESSION_TTL_SECS: u64 = 7200;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Tool registry error: {0}")]
    Registry(#[from] SchemaError),
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Tool schemas and endpoints, with any `<TOOL_NAME>_URL` overrides applied
    pub registry: ToolRegistry,
    /// Timeout for each tool call
    pub tool_timeout: Duration,
    /// Claude configuration (optional, enables model fallbacks)
    pub claude: Option<ClaudeConfig>,
    /// Idle expiry of in-memory sessions
    pub session_ttl: Duration,
}

/// Claude API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-3-5-haiku-latest)
    pub model: String,
    /// Timeout for each model call
    pub timeout: Duration,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OrchestratorConfig {
    /// Configuration with the given registry and default settings, no model.
    #[must_use]
    pub const fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            claude: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, the registry cannot be
    /// loaded, or the API key fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load configuration from an explicit variable map.
    ///
    /// # Errors
    ///
    /// Same as [`OrchestratorConfig::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut registry = match get_optional(vars, "TOOL_REGISTRY_PATH") {
            Some(path) => ToolRegistry::from_path(PathBuf::from(path))?,
            None => ToolRegistry::builtin()?,
        };

        let names: Vec<String> = registry.names().map(str::to_string).collect();
        for name in names {
            let key = endpoint_var(&name);
            if let Some(raw) = get_optional(vars, &key) {
                let url = Url::parse(raw)
                    .map_err(|e| ConfigError::InvalidEnvVar(key.clone(), e.to_string()))?;
                registry.set_endpoint(&name, url);
            }
        }

        let tool_timeout = get_secs(vars, "TOOL_TIMEOUT_SECS", DEFAULT_TOOL_TIMEOUT_SECS)?;
        let session_ttl = get_secs(vars, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;

        Ok(Self {
            registry,
            tool_timeout,
            claude: ClaudeConfig::from_vars(vars)?,
            session_ttl,
        })
    }

    /// Returns Claude configuration if configured.
    #[must_use]
    pub const fn claude(&self) -> Option<&ClaudeConfig> {
        self.claude.as_ref()
    }
}

impl ClaudeConfig {
    /// Returns `None` if `CLAUDE_API_KEY` is not set (model fallbacks disabled).
    fn from_vars(vars: &HashMap<String, String>) -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional(vars, "CLAUDE_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(key, "CLAUDE_API_KEY")?;

        Ok(Some(Self {
            api_key: SecretString::from(key.to_string()),
            model: get_optional(vars, "CLAUDE_MODEL")
                .unwrap_or(DEFAULT_CLAUDE_MODEL)
                .to_string(),
            timeout: get_secs(vars, "CLAUDE_TIMEOUT_SECS", DEFAULT_CLAUDE_TIMEOUT_SECS)?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Name of the endpoint override variable for a tool.
#[must_use]
pub fn endpoint_var(tool_name: &str) -> String {
    format!("{}_URL", tool_name.to_uppercase())
}

/// Get an optional, non-blank variable.
fn get_optional<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Get a positive number of seconds with a default value.
fn get_secs(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional(vars, key) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
