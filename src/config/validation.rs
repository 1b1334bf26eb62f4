//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check prefix shapes and that the mount prefixes do not overlap the API
//! - Validate value ranges (windows > 0, thresholds > 0)
//! - Check that upstream origins and allow-listed origins are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::{EdgeConfig, WindowConfig};
use crate::routing::matcher::PathPrefixMatcher;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: prefix {prefix:?} must start with '/' and must not end with '/'")]
    MalformedPrefix { field: &'static str, prefix: String },

    #[error("{field}: prefix {prefix:?} overlaps the API prefix {api:?}")]
    OverlapsApi {
        field: &'static str,
        prefix: String,
        api: String,
    },

    #[error("{field}: the React bundle needs its own prefix, not the root")]
    ReactAtRoot { field: &'static str },

    #[error("{field}: the landing bundle must be mounted at '/', got {prefix:?}")]
    LandingNotRoot { field: &'static str, prefix: String },

    #[error("{field}: window_ms and max_requests must both be greater than zero")]
    EmptyWindow { field: &'static str },

    #[error("{field}: {value:?} is not a valid origin URL ({reason})")]
    BadOrigin {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("listener.bind_address: {0:?} is not a socket address")]
    BadBindAddress(String),
}

/// Validate a fully-resolved configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BadBindAddress(config.listener.bind_address.clone()));
    }

    let api = &config.api.prefix;
    check_prefix(&mut errors, "api.prefix", api);
    if api == "/" {
        errors.push(ValidationError::MalformedPrefix {
            field: "api.prefix",
            prefix: api.clone(),
        });
    }

    for (field, prefix) in [
        ("assets.react.mount_prefix", &config.assets.react.mount_prefix),
        ("upstreams.react.path_prefix", &config.upstreams.react.path_prefix),
    ] {
        check_prefix(&mut errors, field, prefix);
        if prefix == "/" {
            errors.push(ValidationError::ReactAtRoot { field });
        } else if overlaps(prefix, api) {
            errors.push(ValidationError::OverlapsApi {
                field,
                prefix: prefix.clone(),
                api: api.clone(),
            });
        }
    }

    for (field, prefix) in [
        ("assets.landing.mount_prefix", &config.assets.landing.mount_prefix),
        ("upstreams.landing.path_prefix", &config.upstreams.landing.path_prefix),
    ] {
        if prefix != "/" {
            errors.push(ValidationError::LandingNotRoot {
                field,
                prefix: prefix.clone(),
            });
        }
    }

    check_window(&mut errors, "rate_limit.global", &config.rate_limit.global);
    check_window(&mut errors, "rate_limit.api", &config.rate_limit.api);

    for (field, origin) in [
        ("upstreams.react.origin", &config.upstreams.react.origin),
        ("upstreams.landing.origin", &config.upstreams.landing.origin),
    ] {
        if let Err(reason) = check_origin(origin) {
            errors.push(ValidationError::BadOrigin {
                field,
                value: origin.clone(),
                reason,
            });
        }
    }

    for origin in &config.security.allowed_origins {
        if let Err(reason) = check_origin(origin) {
            errors.push(ValidationError::BadOrigin {
                field: "security.allowed_origins",
                value: origin.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_prefix(errors: &mut Vec<ValidationError>, field: &'static str, prefix: &str) {
    let well_formed = prefix.starts_with('/') && (prefix == "/" || !prefix.ends_with('/'));
    if !well_formed {
        errors.push(ValidationError::MalformedPrefix {
            field,
            prefix: prefix.to_string(),
        });
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    PathPrefixMatcher::new(a).matches_path(b) || PathPrefixMatcher::new(b).matches_path(a)
}

fn check_window(errors: &mut Vec<ValidationError>, field: &'static str, window: &WindowConfig) {
    if window.window_ms == 0 || window.max_requests == 0 {
        errors.push(ValidationError::EmptyWindow { field });
    }
}

/// An origin is `scheme://host[:port]` with an http(s) scheme and no path.
fn check_origin(value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if value.trim_end_matches('/') != url.origin().ascii_serialization() {
        return Err("origins carry no path, query or credentials".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&EdgeConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = EdgeConfig::default();
        config.assets.react.mount_prefix = "/api/app".to_string();
        config.upstreams.landing.path_prefix = "/site".to_string();
        config.rate_limit.api.max_requests = 0;
        config.security.allowed_origins.push("localhost:3000".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::OverlapsApi { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::LandingNotRoot { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyWindow { field: "rate_limit.api" })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::BadOrigin { .. })));
    }

    #[test]
    fn test_react_cannot_take_the_root() {
        let mut config = EdgeConfig::default();
        config.upstreams.react.path_prefix = "/".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ReactAtRoot { field: "upstreams.react.path_prefix" }]);
    }

    #[test]
    fn test_prefix_shape() {
        let mut config = EdgeConfig::default();
        config.api.prefix = "api/".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::MalformedPrefix { field: "api.prefix", .. }));
    }

    #[test]
    fn test_origin_with_path_rejected() {
        assert!(check_origin("https://example.com").is_ok());
        assert!(check_origin("http://localhost:3000").is_ok());
        assert!(check_origin("https://example.com/app").is_err());
        assert!(check_origin("ftp://example.com").is_err());
    }
}
