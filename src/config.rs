//! Runtime configuration: upstream secrets and cache windows.

use std::{collections::HashMap, time::Duration};

/// Where upstream credentials come from. Looked up on every request.
pub trait SecretSource: Send + Sync {
    /// The value for `key`, or `None` when unset or empty.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// A fixed set of secrets, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct StaticSecrets(HashMap<String, String>);

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// How long each integration's payload counts as fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub music_ttl: Duration,
    pub github_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            music_ttl: Duration::from_secs(300),
            github_ttl: Duration::from_secs(60),
        }
    }
}
