//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::mode::RoutingMode;
use crate::config::schema::{EdgeConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inputs that take precedence over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Optional TOML file.
    pub config_path: Option<PathBuf>,
    /// Mode forced from the command line.
    pub mode: Option<RoutingMode>,
    /// Port forced from the command line.
    pub port: Option<u16>,
}

/// Load configuration from the file, the process environment and `options`,
/// then validate it.
pub fn load_config(options: &LoadOptions) -> Result<EdgeConfig, ConfigError> {
    let base = match &options.config_path {
        Some(path) => read_config_file(path)?,
        None => EdgeConfig::default(),
    };
    resolve(base, options, |var| std::env::var(var).ok())
}

/// Parse a TOML file without applying overrides.
pub fn read_config_file(path: &Path) -> Result<EdgeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment and command-line overrides to `config` and validate.
///
/// `env` looks up a variable by name; tests pass a map instead of the real
/// process environment.
pub fn resolve<F>(mut config: EdgeConfig, options: &LoadOptions, env: F) -> Result<EdgeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Mode is decided exactly once, before anything that depends on it.
    if let Some(node_env) = env("NODE_ENV") {
        config.mode = RoutingMode::from_env_value(Some(node_env.as_str()));
    }
    if let Some(mode) = options.mode {
        config.mode = mode;
    }

    if let Some(port) = parse_env::<u16>(&env, "PORT")? {
        config.listener.set_port(port);
    }
    if let Some(port) = options.port {
        config.listener.set_port(port);
    }

    if let Some(origins) = env("ALLOWED_ORIGINS") {
        config.security.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(ToString::to_string)
            .collect();
    }
    if let Some(trust) = parse_env::<bool>(&env, "TRUST_PROXY")? {
        config.security.trust_proxy = trust;
    }

    if let Some(ms) = parse_env(&env, "RATE_LIMIT_WINDOW_MS")? {
        config.rate_limit.global.window_ms = ms;
    }
    if let Some(max) = parse_env(&env, "RATE_LIMIT_MAX")? {
        config.rate_limit.global.max_requests = max;
    }
    if let Some(ms) = parse_env(&env, "API_RATE_LIMIT_WINDOW_MS")? {
        config.rate_limit.api.window_ms = ms;
    }
    if let Some(max) = parse_env(&env, "API_RATE_LIMIT_MAX")? {
        config.rate_limit.api.max_requests = max;
    }

    if let Some(url) = env("REACT_DEV_URL") {
        config.upstreams.react.origin = url;
    }
    if let Some(url) = env("LANDING_DEV_URL") {
        config.upstreams.landing.origin = url;
    }
    if let Some(dir) = env("REACT_DIST_DIR") {
        config.assets.react.root = PathBuf::from(dir);
    }
    if let Some(dir) = env("LANDING_DIST_DIR") {
        config.assets.landing.root = PathBuf::from(dir);
    }

    if let Some(url) = env(config.mode.database_url_var()) {
        config.database.url = Some(url).filter(|u| !u.trim().is_empty());
    }

    if let Some(format) = env("LOG_FORMAT") {
        config.observability.log_format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    var: "LOG_FORMAT",
                    value: format,
                    reason: "expected `json` or `pretty`".to_string(),
                })
            }
        };
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}
