//! Tool registry: name -> definition + executable.

use std::collections::HashMap;
use std::sync::Arc;

use super::execute::{classify_by_status, Classifier};
use super::{ToolDefinition, ToolFn, DEFAULT_MAX_RETRIES};

pub(crate) struct ToolEntry {
    pub definition: ToolDefinition,
    pub function: ToolFn,
    pub classifier: Classifier,
}

/// Registry of callable tools, indexed by name.
///
/// Registration is last-write-wins. Mutation is expected to happen outside of
/// an in-flight orchestration run; per-run state (retry counters,
/// conversation) never lives here.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with the default result classifier.
    pub fn register(&mut self, definition: ToolDefinition, function: ToolFn) -> &mut Self {
        self.register_with_classifier(definition, function, Arc::new(classify_by_status))
    }

    /// Register a tool with a custom success/failure classifier.
    pub fn register_with_classifier(
        &mut self,
        definition: ToolDefinition,
        function: ToolFn,
        classifier: Classifier,
    ) -> &mut Self {
        let name = definition.name.clone();
        self.entries.insert(
            name,
            ToolEntry {
                definition,
                function,
                classifier,
            },
        );
        self
    }

    pub fn get_function(&self, name: &str) -> Option<ToolFn> {
        self.entries.get(name).map(|e| e.function.clone())
    }

    pub(crate) fn get_entry(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    pub fn get_definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.entries.get(name).map(|e| &e.definition)
    }

    /// Retry budget for the named tool; the default when unknown.
    pub fn get_max_retries(&self, name: &str) -> u32 {
        self.entries
            .get(name)
            .map(|e| e.definition.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }

    /// Read-only snapshot of every definition, the advertised tool list.
    pub fn export(&self) -> HashMap<String, ToolDefinition> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.definition.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
