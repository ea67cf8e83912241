//! Addon configuration loading and validation.
//!
//! Configuration arrives as a free-form document (JSON value or YAML text)
//! supplied by the host program. Construction validates that the secrets
//! mapping carries the Anthropic API key; a config without it never exists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Secret keys that must be present for the addon to operate.
const REQUIRED_SECRETS: &[&str] = &["anthropic_api_key"];

/// Validated addon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub addon_type: String,
    pub name: String,
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub secrets: HashMap<String, String>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,

    /// Default Anthropic model to use
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens for responses
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl AddonConfig {
    /// Build a config from a JSON value, validating required secrets.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from a YAML document, validating required secrets.
    pub fn from_yaml_str(document: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = REQUIRED_SECRETS
            .iter()
            .copied()
            .filter(|key| !self.secrets.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::configuration_with_context(
                format!("Missing Anthropic secrets: {:?}", missing),
                ErrorContext::new()
                    .with_field_path("secrets")
                    .with_source("addon_config"),
            ));
        }
        Ok(())
    }

    /// The Anthropic API key. Present by construction, but an empty value
    /// still counts as missing.
    pub fn api_key(&self) -> Result<&str> {
        self.secrets
            .get("anthropic_api_key")
            .map(String::as_str)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "Anthropic API key not found in credentials",
                    ErrorContext::new()
                        .with_field_path("secrets.anthropic_api_key")
                        .with_source("addon_config"),
                )
            })
    }
}
