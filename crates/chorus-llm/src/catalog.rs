use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use chorus_types::ProviderFailure;

use crate::{ProviderSpec, VariantId, Vendor};

// ---------------------------------------------------------------------------
// VariantEntry / VendorProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantEntry {
    pub id: VariantId,
    /// Model string sent on the wire.
    pub model: String,
    /// Display label for result panels.
    pub label: String,
}

impl VariantEntry {
    pub fn new(id: &str, model: &str, label: &str) -> Self {
        Self {
            id: VariantId::new(id),
            model: model.to_string(),
            label: label.to_string(),
        }
    }
}

/// Static wire facts about one vendor plus its known variants.
#[derive(Debug, Clone)]
pub struct VendorProfile {
    pub vendor: Vendor,
    pub base_url: String,
    /// Credential names tried in order.
    pub credential_keys: Vec<String>,
    /// JSON pointer to the generated text in a successful response.
    pub text_pointer: &'static str,
    pub variants: Vec<VariantEntry>,
}

impl VendorProfile {
    pub fn variant(&self, id: &VariantId) -> Option<&VariantEntry> {
        self.variants.iter().find(|v| &v.id == id)
    }
}

/// A catalog lookup that succeeded: everything an adapter call needs besides
/// the prompt and the credential.
#[derive(Debug, Clone)]
pub struct ResolvedVariant {
    pub spec: ProviderSpec,
    pub model: String,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Table of vendors and their variants: vendor → base URL → variant → text
/// pointer. Adding a variant is a data change only.
#[derive(Debug, Clone)]
pub struct Catalog {
    vendors: BTreeMap<Vendor, VendorProfile>,
}

impl Catalog {
    /// A catalog with no vendors. Mostly useful in tests.
    pub fn empty() -> Self {
        Self {
            vendors: BTreeMap::new(),
        }
    }

    pub fn new() -> Self {
        let mut catalog = Self::empty();

        catalog.insert_vendor(VendorProfile {
            vendor: Vendor::OpenAi,
            base_url: "https://api.openai.com".to_string(),
            credential_keys: vec!["OPENAI_API_KEY".to_string()],
            text_pointer: "/choices/0/message/content",
            variants: vec![
                VariantEntry::new("gpt-4-turbo", "gpt-4-turbo-preview", "GPT-4 Turbo (best quality)"),
                VariantEntry::new("gpt-3.5-turbo", "gpt-3.5-turbo", "GPT-3.5 Turbo (best value)"),
            ],
        });

        catalog.insert_vendor(VendorProfile {
            vendor: Vendor::Anthropic,
            base_url: "https://api.anthropic.com".to_string(),
            credential_keys: vec!["ANTHROPIC_API_KEY".to_string()],
            text_pointer: "/content/0/text",
            variants: vec![
                VariantEntry::new("opus", "claude-3-opus-20240229", "Claude 3 Opus (best quality)"),
                VariantEntry::new("sonnet", "claude-3-sonnet-20240229", "Claude 3 Sonnet (best value)"),
            ],
        });

        catalog.insert_vendor(VendorProfile {
            vendor: Vendor::Google,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            credential_keys: vec!["GEMINI_API_KEY".to_string(), "GOOGLE_API_KEY".to_string()],
            text_pointer: "/candidates/0/content/parts",
            variants: vec![
                VariantEntry::new("gemini-ultra", "gemini-ultra", "Gemini Ultra (best quality)"),
                VariantEntry::new("gemini-pro", "gemini-pro", "Gemini Pro (best value)"),
            ],
        });

        catalog.insert_vendor(VendorProfile {
            vendor: Vendor::Perplexity,
            base_url: "https://api.perplexity.ai".to_string(),
            credential_keys: vec!["PERPLEXITY_API_KEY".to_string()],
            text_pointer: "/choices/0/message/content",
            variants: vec![
                VariantEntry::new("sonar", "sonar", "Perplexity Sonar"),
                VariantEntry::new("sonar-pro", "sonar-pro", "Perplexity Sonar Pro"),
            ],
        });

        catalog
    }

    pub fn insert_vendor(&mut self, profile: VendorProfile) {
        self.vendors.insert(profile.vendor, profile);
    }

    pub fn vendor(&self, vendor: Vendor) -> Option<&VendorProfile> {
        self.vendors.get(&vendor)
    }

    pub fn vendors(&self) -> impl Iterator<Item = &VendorProfile> {
        self.vendors.values()
    }

    /// Point a vendor at a different endpoint (proxies, test servers).
    pub fn set_base_url(&mut self, vendor: Vendor, base_url: impl Into<String>) -> bool {
        match self.vendors.get_mut(&vendor) {
            Some(profile) => {
                profile.base_url = base_url.into().trim_end_matches('/').to_string();
                true
            }
            None => false,
        }
    }

    /// Add a variant, replacing an existing one with the same id.
    pub fn add_variant(&mut self, vendor: Vendor, entry: VariantEntry) -> bool {
        let Some(profile) = self.vendors.get_mut(&vendor) else {
            return false;
        };
        match profile.variants.iter_mut().find(|v| v.id == entry.id) {
            Some(existing) => *existing = entry,
            None => profile.variants.push(entry),
        }
        true
    }

    /// Every known spec, in vendor then declaration order.
    pub fn specs(&self) -> Vec<ProviderSpec> {
        self.vendors
            .values()
            .flat_map(|p| {
                p.variants.iter().map(|v| ProviderSpec {
                    vendor: p.vendor,
                    variant: v.id.clone(),
                })
            })
            .collect()
    }

    /// Resolve a spec to its wire model string and label, or fail with
    /// `UnknownVariant`. No fallback to a default variant.
    pub fn resolve(&self, spec: &ProviderSpec) -> Result<ResolvedVariant, ProviderFailure> {
        let profile = self.vendors.get(&spec.vendor).ok_or_else(|| {
            ProviderFailure::unknown_variant(format!("vendor '{}' is not configured", spec.vendor))
        })?;
        let entry = profile.variant(&spec.variant).ok_or_else(|| {
            let known: Vec<&str> = profile.variants.iter().map(|v| v.id.as_str()).collect();
            ProviderFailure::unknown_variant(format!(
                "'{}' is not a known {} variant (known: {})",
                spec.variant,
                spec.vendor,
                known.join(", ")
            ))
        })?;
        Ok(ResolvedVariant {
            spec: spec.clone(),
            model: entry.model.clone(),
            label: entry.label.clone(),
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
