//! Credential lookup: sources that supply secrets by key, and the resolver
//! that turns a vendor into a validated [`Credential`].
//!
//! Resolution order for a vendor follows the catalog's `credential_keys`; the
//! first key present in the source decides the outcome.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use chorus_types::{ChorusError, ProviderFailure};

use crate::{Catalog, Credential, Vendor};

// ---------------------------------------------------------------------------
// CredentialSource
// ---------------------------------------------------------------------------

/// External configuration that can hand out secrets by key.
pub trait CredentialSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

pub type DynCredentialSource = Arc<dyn CredentialSource>;

/// Reads secrets from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        // Non-unicode values are treated as absent.
        std::env::var(key).ok()
    }
}

/// In-memory secrets.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// A flat TOML secrets file:
///
/// ```toml
/// OPENAI_API_KEY = "sk-..."
/// ANTHROPIC_API_KEY = "sk-ant-..."
/// ```
///
/// Non-string values and nested tables are ignored.
#[derive(Debug, Default, Clone)]
pub struct SecretsFile {
    values: HashMap<String, String>,
}

impl SecretsFile {
    pub fn from_path(path: &Path) -> chorus_types::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> chorus_types::Result<Self> {
        let table: toml::Table = source.parse().map_err(ChorusError::Toml)?;
        let values = table
            .into_iter()
            .filter_map(|(k, v)| match v {
                toml::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect();
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CredentialSource for SecretsFile {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Ordered list of sources; the first one that knows a key wins.
#[derive(Default, Clone)]
pub struct CredentialChain {
    sources: Vec<DynCredentialSource>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl CredentialSource for CredentialChain {
    fn get(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|s| s.get(key))
    }
}

// ---------------------------------------------------------------------------
// CredentialResolver
// ---------------------------------------------------------------------------

/// Maps a vendor to its credential using the catalog's key names.
#[derive(Clone)]
pub struct CredentialResolver {
    source: DynCredentialSource,
    keys: BTreeMap<Vendor, Vec<String>>,
}

impl CredentialResolver {
    pub fn new(source: impl CredentialSource + 'static, catalog: &Catalog) -> Self {
        Self::from_shared(Arc::new(source), catalog)
    }

    pub fn from_shared(source: DynCredentialSource, catalog: &Catalog) -> Self {
        let keys = catalog
            .vendors()
            .map(|p| (p.vendor, p.credential_keys.clone()))
            .collect();
        Self { source, keys }
    }

    /// Look up and validate the vendor's credential. Pure lookup, no I/O
    /// beyond the source itself.
    pub fn resolve(&self, vendor: Vendor) -> Result<Credential, ProviderFailure> {
        let keys = self.keys.get(&vendor).map(Vec::as_slice).unwrap_or_default();
        if keys.is_empty() {
            return Err(ProviderFailure::missing_credential(format!(
                "no credential key configured for {vendor}"
            )));
        }

        for key in keys {
            let Some(raw) = self.source.get(key) else {
                continue;
            };
            let secret = raw.trim();
            if secret.is_empty() {
                return Err(ProviderFailure::missing_credential(format!("{key} is empty")));
            }
            if secret.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(ProviderFailure::missing_credential(format!(
                    "{key} is malformed (contains whitespace or control characters)"
                )));
            }
            return Ok(Credential::new(secret));
        }

        Err(ProviderFailure::missing_credential(format!(
            "{} is not set",
            keys.join(" or ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
