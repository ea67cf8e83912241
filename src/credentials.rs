//! Credential storage for the addon lifecycle.

use std::collections::HashMap;
use std::env;

use keyring::Entry;

/// Keyring service name used for OS-level credential lookup.
const KEYRING_SERVICE: &str = "anthropic-rooms-addon";

/// In-memory credential registry with OS fallbacks.
///
/// Lookup order on `get`:
/// 1. credentials stored by the host via `store`/`store_multiple`
/// 2. the OS keyring entry for this addon
/// 3. the upper-cased environment variable of the same name
#[derive(Debug, Default)]
pub struct CredentialsRegistry {
    secrets: HashMap<String, String>,
}

impl CredentialsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(key.into(), value.into());
    }

    pub fn store_multiple(&mut self, credentials: HashMap<String, String>) {
        self.secrets.extend(credentials);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.secrets.get(key) {
            return Some(value.clone());
        }

        if let Ok(entry) = Entry::new(KEYRING_SERVICE, key) {
            if let Ok(value) = entry.get_password() {
                return Some(value);
            }
        }

        env::var(key.to_uppercase()).ok()
    }

    /// Whether the key was explicitly stored (fallbacks not consulted).
    pub fn contains(&self, key: &str) -> bool {
        self.secrets.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.secrets.clear();
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}
