//! Provider Registry
//!
//! Maps user-facing model choices (`GPT-4o`, `Claude`, ...) to the adapter
//! and vendor model that serve them.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::LlmProvider;

/// Resolution of a model choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRoute {
    /// Name the caller uses
    pub choice: String,
    /// Provider name
    pub provider: &'static str,
    /// Vendor model name
    pub model: String,
}

/// Registry of adapters keyed by provider and routes keyed by model choice
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn LlmProvider>>,
    routes: HashMap<String, ModelRoute>,
}

impl ProviderRegistry {
    /// Create new provider registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any adapter with the same name
    pub fn register_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    /// Route a model choice to a registered provider's model
    pub fn register_model(
        &mut self,
        choice: impl Into<String>,
        provider: &'static str,
        model: impl Into<String>,
    ) {
        let choice = choice.into();
        self.routes.insert(
            choice.clone(),
            ModelRoute {
                choice,
                provider,
                model: model.into(),
            },
        );
    }

    /// Resolve a model choice
    pub fn resolve(&self, choice: &str) -> Option<&ModelRoute> {
        self.routes.get(choice)
    }

    /// Get provider by name
    pub fn provider(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(name).cloned()
    }

    /// Routes sorted by model choice
    pub fn routes(&self) -> Vec<&ModelRoute> {
        let mut routes: Vec<_> = self.routes.values().collect();
        routes.sort_by(|a, b| a.choice.cmp(&b.choice));
        routes
    }

    /// Provider names sorted alphabetically
    pub fn provider_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .field("models", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
