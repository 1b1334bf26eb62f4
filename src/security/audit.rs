//! Audit logging for security-relevant paths.
//!
//! Requests whose path looks like a credential, admin or configuration probe
//! are logged on the `security` target whether or not they succeed.

const SECURITY_KEYWORDS: &[&str] = &[
    "login",
    "logout",
    "password-reset",
    "account-creation",
    "admin",
    "config",
    "debug",
    ".env",
    "wp-admin",
];

/// Case-insensitive substring match against the keyword list.
pub fn is_security_event(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    SECURITY_KEYWORDS.iter().any(|keyword| path.contains(keyword))
}

pub fn log_security_event(method: &str, path: &str, client: &str, user_agent: Option<&str>) {
    tracing::warn!(
        target: "security",
        method = %method,
        path = %path,
        client = %client,
        user_agent = user_agent.unwrap_or("-"),
        "Security event"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_paths() {
        assert!(is_security_event("/wp-admin/install.php"));
        assert!(is_security_event("/.env"));
        assert!(is_security_event("/api/Login"));
        assert!(is_security_event("/app/config.json"));
        assert!(!is_security_event("/app/settings"));
        assert!(!is_security_event("/api/health"));
    }
}
