//! Shared utility functions for provider adapters.

use lc_domain::config::{AuthConfig, AuthMode};
use lc_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence: `mode = none` (no key), then the plaintext `key` field
/// (warns), then the `env` variable.
pub fn resolve_api_key(auth: &AuthConfig) -> Result<Option<String>> {
    if auth.mode == AuthMode::None {
        return Ok(None);
    }

    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key', prefer 'env' instead"
        );
        return Ok(Some(key.clone()));
    }

    if let Some(ref env_var) = auth.env {
        return std::env::var(env_var).map(Some).map_err(|_| {
            Error::Auth(format!(
                "environment variable '{}' not set or not valid UTF-8",
                env_var
            ))
        });
    }

    Err(Error::Auth(
        "no API key configured: set 'key' or 'env' in the provider auth, or mode = \"none\"".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_none_needs_no_key() {
        let auth = AuthConfig { mode: AuthMode::None, ..Default::default() };
        assert_eq!(resolve_api_key(&auth).unwrap(), None);
    }

    #[test]
    fn plaintext_key_wins_over_env() {
        let auth = AuthConfig {
            key: Some("sk-test-123".into()),
            env: Some("LC_TEST_SHOULD_NOT_BE_READ".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&auth).unwrap().as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn env_var_is_read() {
        let var_name = "LC_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let auth = AuthConfig { env: Some(var_name.into()), ..Default::default() };
        assert_eq!(resolve_api_key(&auth).unwrap().as_deref(), Some("env-secret-value"));
        std::env::remove_var(var_name);
    }

    #[test]
    fn missing_env_var_names_the_variable() {
        let auth = AuthConfig {
            env: Some("LC_TEST_NONEXISTENT_VAR_8888".into()),
            ..Default::default()
        };
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("LC_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let err = resolve_api_key(&AuthConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no API key configured"));
    }
}
