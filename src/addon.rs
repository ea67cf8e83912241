//! Addon facade.
//!
//! The entry point host programs instantiate: owns the validated
//! configuration, the credential registry, the tool registry and the
//! optional observer wiring, and exposes the three actions with everything
//! pre-wired.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::actions::{
    chat, file_analysis as file_analysis_action, web_search as web_search_action, ActionResponse,
    ChatOutput, ChatParams, FileAnalysisOutput, FileAnalysisParams, WebSearchOutput,
    WebSearchParams,
};
use crate::config::AddonConfig;
use crate::credentials::CredentialsRegistry;
use crate::observer::ToolObserver;
use crate::tools::{ToolDefinition, ToolFn, ToolGroupConfig, ToolRegistry};
use crate::{Error, ErrorContext, Result};

/// Compiled-in modules, reported by [`Addon::self_check`].
const MODULES: &[&str] = &[
    "actions",
    "client",
    "config",
    "context",
    "credentials",
    "observer",
    "tools",
    "types",
];

/// Anthropic rooms addon.
///
/// Lifecycle: construct, `load_config`, `load_credentials`, optionally
/// `load_tools` / `set_observer`, then call actions.
#[derive(Default)]
pub struct Addon {
    config: Option<AddonConfig>,
    credentials: CredentialsRegistry,
    tool_registry: ToolRegistry,
    observer: Option<Arc<dyn ToolObserver>>,
    addon_id: Option<String>,
}

impl Addon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate addon configuration. Returns false on any failure.
    pub fn load_config(&mut self, config: serde_json::Value) -> bool {
        match AddonConfig::from_value(config) {
            Ok(config) => {
                info!(addon = %config.name, "addon configuration loaded successfully");
                self.config = Some(config);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to load addon configuration");
                false
            }
        }
    }

    pub fn config(&self) -> Option<&AddonConfig> {
        self.config.as_ref()
    }

    /// Store credentials, first validating that every secret the config
    /// declares is supplied. Returns false on any failure.
    pub fn load_credentials(&mut self, credentials: HashMap<String, String>) -> bool {
        debug!(count = credentials.len(), "loading credentials");

        if let Some(config) = &self.config {
            let missing: Vec<&String> = config
                .secrets
                .keys()
                .filter(|key| !credentials.contains_key(*key))
                .collect();
            if !missing.is_empty() {
                error!(?missing, "missing required secrets");
                return false;
            }
        }

        let count = credentials.len();
        self.credentials.store_multiple(credentials);
        info!(count, "credentials loaded successfully");
        true
    }

    pub fn credentials(&self) -> &CredentialsRegistry {
        &self.credentials
    }

    /// Register tools from host-supplied group configuration.
    ///
    /// Each group names one action or a list of actions; actions with a
    /// matching function are registered under the group's schema with the
    /// shared context string as their description.
    pub fn load_tools(
        &mut self,
        groups: &HashMap<String, ToolGroupConfig>,
        functions: &HashMap<String, ToolFn>,
        context: &str,
    ) {
        debug!(
            groups = groups.len(),
            functions = functions.len(),
            "loading tools"
        );

        for group in groups.values() {
            for action in group.action.names() {
                let Some(function) = functions.get(action) else {
                    continue;
                };

                let description = if context.is_empty() {
                    format!("Execute {} action", action)
                } else {
                    context.to_string()
                };

                let mut definition = ToolDefinition::new(action, description);
                if let Some(schema) = &group.input_schema {
                    definition = definition.input_schema(schema.clone());
                }
                if let Some(max_retries) = group.max_retries {
                    definition = definition.max_retries(max_retries);
                }

                self.tool_registry.register(definition, function.clone());
            }
        }

        info!(
            registered = self.tool_registry.len(),
            tools = ?self.tool_registry.export().keys().collect::<Vec<_>>(),
            "tools registered"
        );
    }

    /// Snapshot of the registered tool definitions.
    pub fn tools(&self) -> HashMap<String, ToolDefinition> {
        self.tool_registry.export()
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn tool_registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tool_registry
    }

    pub fn clear_tools(&mut self) {
        self.tool_registry.clear();
    }

    /// Wire a tool execution observer. Both pieces are required: reporting
    /// only happens when an observer and an addon id are configured.
    pub fn set_observer(&mut self, observer: Arc<dyn ToolObserver>, addon_id: impl Into<String>) {
        self.observer = Some(observer);
        self.addon_id = Some(addon_id.into());
    }

    fn require_config(&self) -> Result<&AddonConfig> {
        self.config.as_ref().ok_or_else(|| {
            Error::configuration_with_context(
                "addon configuration not loaded",
                ErrorContext::new().with_source("addon"),
            )
        })
    }

    /// Chat completion with the registry, observer and addon id pre-wired.
    /// Tools are only advertised when at least one is registered.
    pub async fn chat_completion(&self, params: ChatParams) -> Result<ActionResponse<ChatOutput>> {
        let config = self.require_config()?;

        let registry = if self.tool_registry.is_empty() {
            debug!("no tools available for this chat completion");
            None
        } else {
            Some(&self.tool_registry)
        };

        Ok(chat::chat_completion(
            config,
            params,
            registry,
            self.observer.clone(),
            self.addon_id.as_deref(),
        )
        .await)
    }

    pub async fn file_analysis(
        &self,
        params: FileAnalysisParams,
    ) -> Result<ActionResponse<FileAnalysisOutput>> {
        let config = self.require_config()?;
        file_analysis_action::file_analysis(config, &self.credentials, params).await
    }

    pub async fn web_search(
        &self,
        params: WebSearchParams,
    ) -> Result<ActionResponse<WebSearchOutput>> {
        let config = self.require_config()?;
        Ok(web_search_action::web_search(config, &self.credentials, params).await)
    }

    /// Report the addon's component inventory and whether it is ready to
    /// serve calls.
    pub fn self_check(&self) -> bool {
        info!("running anthropic-rooms-addon self check");
        for module in MODULES {
            info!(module = %module, "module available");
        }
        info!(
            config_loaded = self.config.is_some(),
            credentials = self.credentials.len(),
            tools = self.tool_registry.len(),
            observer = self.observer.is_some(),
            "self check completed"
        );
        true
    }
}

impl std::fmt::Debug for Addon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Addon")
            .field("config", &self.config.as_ref().map(|c| c.id.as_str()))
            .field("credentials", &self.credentials.len())
            .field("tools", &self.tool_registry.len())
            .field("addon_id", &self.addon_id)
            .finish()
    }
}
