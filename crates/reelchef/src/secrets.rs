//! Secret resolution and comparison.
//!
//! API keys and the worker shared secret can come from three places, tried
//! in order:
//!
//! 1. **Direct value** in the config file (local testing)
//! 2. **File reference** (Docker secrets, e.g. `/run/secrets/transcript_key`)
//! 3. **Environment variable** (Kubernetes / production)

use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from the first non-empty source.
///
/// File contents and environment values are trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return std::fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|source| SecretError::FileReadError {
                path: expanded,
                source,
            });
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but `None` when no source is configured.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Compares a presented token against the expected secret without
/// short-circuiting on the first differing byte.
pub fn verify_shared_secret(expected: &SecretString, presented: &str) -> bool {
    let expected = expected.expose_secret().as_bytes();
    let presented = presented.as_bytes();
    if expected.is_empty() || expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Expands a leading `~` to the current user's home directory.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("REELCHEF_TEST_SECRET", "from-env");
        let secret =
            resolve_secret(Some("direct"), None, Some("REELCHEF_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("REELCHEF_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        std::env::set_var("REELCHEF_TEST_SECRET", "from-env");

        let path = file.path().to_string_lossy().to_string();
        let secret = resolve_secret(None, Some(&path), Some("REELCHEF_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
        std::env::remove_var("REELCHEF_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("REELCHEF_TEST_SECRET", "from-env\n");
        let secret = resolve_secret(None, None, Some("REELCHEF_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("REELCHEF_TEST_SECRET");
    }

    #[test]
    fn test_no_source_error() {
        assert!(matches!(
            resolve_secret(None, Some(""), None),
            Err(SecretError::NoSourceProvided)
        ));
        assert!(resolve_secret_optional(None, None, None).unwrap().is_none());
    }

    #[test]
    fn test_file_not_found_error() {
        let result = resolve_secret(None, Some("/nonexistent/secret"), None);
        assert!(matches!(result, Err(SecretError::FileReadError { .. })));
    }

    #[test]
    #[serial]
    fn test_env_var_not_set_error() {
        std::env::remove_var("REELCHEF_TEST_MISSING");
        let result = resolve_secret_optional(None, None, Some("REELCHEF_TEST_MISSING"));
        assert!(matches!(result, Err(SecretError::EnvVarNotSet { .. })));
    }

    #[test]
    fn test_verify_shared_secret() {
        let expected = SecretString::from("s3cret-token".to_string());
        assert!(verify_shared_secret(&expected, "s3cret-token"));
        assert!(!verify_shared_secret(&expected, "s3cret-tokem"));
        assert!(!verify_shared_secret(&expected, "s3cret"));
        assert!(!verify_shared_secret(&expected, ""));

        let empty = SecretString::from(String::new());
        assert!(!verify_shared_secret(&empty, ""));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home("~/secret"),
                format!("{}/secret", home.to_string_lossy())
            );
        }
    }
}
