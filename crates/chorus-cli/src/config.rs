//! Optional `chorus.toml` configuration.
//!
//! ```toml
//! [defaults]
//! max_tokens = 512
//! temperature = 0.7
//! timeout_secs = 30
//! retries = 2
//!
//! [vendors.openai]
//! base_url = "https://proxy.internal/openai"
//! variants = [{ id = "gpt-4o", model = "gpt-4o", label = "GPT-4o" }]
//! ```
//!
//! Command-line flags take precedence over `[defaults]`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use chorus_llm::{Catalog, GenerationOptions, VariantEntry, Vendor, DEFAULT_REQUEST_TIMEOUT};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "chorus.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChorusConfig {
    pub defaults: Defaults,
    /// Keyed by vendor name or alias (`openai`, `claude`, `gemini`, ...).
    pub vendors: BTreeMap<String, VendorConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VendorConfig {
    pub base_url: Option<String>,
    pub variants: Vec<VariantConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    pub id: String,
    pub model: String,
    /// Defaults to the model string.
    pub label: Option<String>,
}

impl ChorusConfig {
    /// Load an explicit config file, or `chorus.toml` in the working
    /// directory if present, or defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config =
            Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), vendors = config.vendors.len(), "Loaded config");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if config.defaults.timeout_secs == Some(0) {
            bail!("[defaults] timeout_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Apply vendor overrides to the catalog.
    pub fn apply(&self, catalog: &mut Catalog) -> Result<()> {
        for (name, overrides) in &self.vendors {
            let vendor: Vendor = name
                .parse()
                .with_context(|| format!("[vendors.{name}] is not a known vendor"))?;

            if let Some(url) = &overrides.base_url {
                if url.trim().is_empty() {
                    bail!("[vendors.{name}] base_url must not be empty");
                }
                catalog.set_base_url(vendor, url.trim());
            }

            for variant in &overrides.variants {
                if variant.id.trim().is_empty() || variant.model.trim().is_empty() {
                    bail!("[vendors.{name}] variants need a non-empty id and model");
                }
                let label = variant.label.as_deref().unwrap_or(&variant.model);
                catalog.add_variant(
                    vendor,
                    VariantEntry::new(variant.id.trim(), variant.model.trim(), label),
                );
            }
        }
        Ok(())
    }

    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_tokens: self.defaults.max_tokens,
            temperature: self.defaults.temperature,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.defaults
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn retries(&self) -> usize {
        self.defaults.retries.unwrap_or(0)
    }
}
