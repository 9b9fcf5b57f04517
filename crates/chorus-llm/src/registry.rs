use std::collections::HashMap;
use std::sync::Arc;

use chorus_types::ProviderFailure;

use crate::{
    AnthropicAdapter, BackoffPolicy, Catalog, DynAdapter, GeminiAdapter, OpenAiAdapter,
    PerplexityAdapter, ProviderAdapter, ProviderSpec, ResolvedVariant, RetryAdapter, Vendor,
};

// ---------------------------------------------------------------------------
// ResolvedTarget
// ---------------------------------------------------------------------------

/// A spec bound to the adapter that will serve it.
#[derive(Clone)]
pub struct ResolvedTarget {
    pub variant: ResolvedVariant,
    pub adapter: DynAdapter,
}

// ---------------------------------------------------------------------------
// AdapterRegistry
// ---------------------------------------------------------------------------

/// One adapter per vendor plus the catalog used to resolve specs.
///
/// Constructed explicitly and handed to the dispatcher; there is no global
/// client state.
pub struct AdapterRegistry {
    adapters: HashMap<Vendor, DynAdapter>,
    catalog: Catalog,
}

impl AdapterRegistry {
    /// A registry with no adapters registered.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            adapters: HashMap::new(),
            catalog,
        }
    }

    /// Register the HTTP adapter for every vendor in the catalog, sharing one
    /// client.
    pub fn with_http_adapters(catalog: Catalog, client: reqwest::Client) -> Self {
        let mut registry = Self::new(catalog);
        let profiles: Vec<_> = registry.catalog.vendors().cloned().collect();
        for profile in &profiles {
            let adapter: DynAdapter = match profile.vendor {
                Vendor::OpenAi => Arc::new(OpenAiAdapter::from_profile(client.clone(), profile)),
                Vendor::Anthropic => {
                    Arc::new(AnthropicAdapter::from_profile(client.clone(), profile))
                }
                Vendor::Google => Arc::new(GeminiAdapter::from_profile(client.clone(), profile)),
                Vendor::Perplexity => {
                    Arc::new(PerplexityAdapter::from_profile(client.clone(), profile))
                }
            };
            tracing::debug!(vendor = %profile.vendor, base_url = %profile.base_url, "Registered adapter");
            registry.register_shared(adapter);
        }
        registry
    }

    pub fn register(&mut self, adapter: impl ProviderAdapter + 'static) {
        self.register_shared(Arc::new(adapter));
    }

    pub fn register_shared(&mut self, adapter: DynAdapter) {
        self.adapters.insert(adapter.vendor(), adapter);
    }

    /// Wrap every registered adapter in a [`RetryAdapter`].
    pub fn with_retries(mut self, max_retries: usize, policy: BackoffPolicy) -> Self {
        if max_retries == 0 {
            return self;
        }
        self.adapters = self
            .adapters
            .into_iter()
            .map(|(vendor, inner)| {
                let wrapped: DynAdapter =
                    Arc::new(RetryAdapter::new(inner, max_retries).with_policy(policy.clone()));
                (vendor, wrapped)
            })
            .collect();
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn adapter(&self, vendor: Vendor) -> Option<&DynAdapter> {
        self.adapters.get(&vendor)
    }

    /// Bind a spec to its model string and adapter, or fail with
    /// `UnknownVariant`.
    pub fn resolve(&self, spec: &ProviderSpec) -> Result<ResolvedTarget, ProviderFailure> {
        let variant = self.catalog.resolve(spec)?;
        let adapter = self.adapters.get(&spec.vendor).cloned().ok_or_else(|| {
            ProviderFailure::unknown_variant(format!(
                "no adapter registered for vendor '{}'",
                spec.vendor
            ))
        })?;
        Ok(ResolvedTarget { variant, adapter })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
