//! Runtime credential resolution.
//!
//! Config files store only env var NAMES (e.g. `"PODIUM_API_KEY"`); values
//! are read from the environment once at startup and carried in
//! [`ResolvedCredentials`]. `Debug` output redacts values, and error paths
//! reference the env var NAME only.

use crate::NetworkSection;

/// Credentials resolved from the environment for one connector instance.
///
/// Bearer token takes precedence over basic credentials downstream; this
/// struct only carries what was found. **Values are redacted in `Debug`.**
#[derive(Clone, Default)]
pub struct ResolvedCredentials {
    /// Bearer token. `None` if the named env var was absent or empty.
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("username", &self.username.as_ref().map(|_| "<REDACTED>"))
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve a named environment variable. Unset or blank values map to `None`;
/// the value is never surfaced in any error path.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve connector credentials from the env var names in `network`.
///
/// All credentials are optional: an unauthenticated server needs none, and
/// the connector sends no Authorization header when nothing resolves.
pub fn resolve_credentials(network: &NetworkSection) -> ResolvedCredentials {
    ResolvedCredentials {
        api_key: resolve_env(&network.api_key_env),
        username: resolve_env(&network.username_env),
        password: resolve_env(&network.password_env),
    }
}
