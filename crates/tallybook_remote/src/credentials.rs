//! Credential provisioning.
//!
//! Tokens are never embedded in configuration; a [`SecretProvider`] is asked
//! for them each time an authenticated request is built.

use std::fmt;

use crate::error::RemoteError;

/// Default environment variable read by [`EnvSecretProvider`].
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Opaque access token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("token {}", self.0)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

pub trait SecretProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, RemoteError>;
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

impl SecretProvider for EnvSecretProvider {
    fn credentials(&self) -> Result<Credentials, RemoteError> {
        let token = std::env::var(&self.var).map_err(|_| {
            RemoteError::Credentials(format!("{} environment variable not set", self.var))
        })?;

        if token.trim().is_empty() {
            return Err(RemoteError::Credentials(format!("{} is empty", self.var)));
        }

        Ok(Credentials::new(token.trim()))
    }
}

/// Fixed credentials, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticSecretProvider(Credentials);

impl StaticSecretProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Credentials::new(token))
    }
}

impl SecretProvider for StaticSecretProvider {
    fn credentials(&self) -> Result<Credentials, RemoteError> {
        Ok(self.0.clone())
    }
}
