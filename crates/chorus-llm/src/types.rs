use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use chorus_types::ChorusError;

// ---------------------------------------------------------------------------
// Vendor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
    Perplexity,
}

impl Vendor {
    pub const ALL: [Vendor; 4] = [
        Vendor::OpenAi,
        Vendor::Anthropic,
        Vendor::Google,
        Vendor::Perplexity,
    ];

    /// Canonical lowercase name, as used in `vendor/variant` specs.
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Anthropic => "anthropic",
            Vendor::Google => "google",
            Vendor::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vendor {
    type Err = ChorusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" => Ok(Vendor::OpenAi),
            "anthropic" | "claude" => Ok(Vendor::Anthropic),
            "google" | "gemini" => Ok(Vendor::Google),
            "perplexity" | "pplx" => Ok(Vendor::Perplexity),
            other => Err(ChorusError::InvalidSpec {
                spec: s.to_string(),
                message: format!("unknown vendor '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// VariantId / ProviderSpec
// ---------------------------------------------------------------------------

/// Vendor-scoped variant key such as `gpt-4-turbo` or `sonnet`. Its meaning
/// comes from the [`Catalog`](crate::Catalog). Always trimmed and lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VariantId(String);

impl VariantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VariantId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<VariantId> for String {
    fn from(id: VariantId) -> Self {
        id.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vendor plus one of its model variants. Textual form is `vendor/variant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub vendor: Vendor,
    pub variant: VariantId,
}

impl ProviderSpec {
    pub fn new(vendor: Vendor, variant: impl Into<String>) -> Self {
        Self {
            vendor,
            variant: VariantId::new(variant),
        }
    }
}

impl fmt::Display for ProviderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.variant)
    }
}

impl FromStr for ProviderSpec {
    type Err = ChorusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, variant) = s.split_once('/').ok_or_else(|| ChorusError::InvalidSpec {
            spec: s.to_string(),
            message: "expected 'vendor/variant'".into(),
        })?;
        let variant = variant.trim();
        if variant.is_empty() {
            return Err(ChorusError::InvalidSpec {
                spec: s.to_string(),
                message: "variant must not be empty".into(),
            });
        }
        let vendor = vendor.parse::<Vendor>().map_err(|_| ChorusError::InvalidSpec {
            spec: s.to_string(),
            message: format!("unknown vendor '{}'", vendor.trim()),
        })?;
        Ok(ProviderSpec::new(vendor, variant))
    }
}

// ---------------------------------------------------------------------------
// GenerationOptions / PromptRequest
// ---------------------------------------------------------------------------

pub const MAX_TEMPERATURE: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn validate(&self) -> chorus_types::Result<()> {
        if self.max_tokens == Some(0) {
            return Err(ChorusError::InvalidOption {
                name: "max_tokens".into(),
                message: "must be greater than zero".into(),
            });
        }
        if let Some(t) = self.temperature {
            if !(0.0..=MAX_TEMPERATURE).contains(&t) {
                return Err(ChorusError::InvalidOption {
                    name: "temperature".into(),
                    message: format!("{t} is outside 0.0..={MAX_TEMPERATURE}"),
                });
            }
        }
        Ok(())
    }
}

/// The user's prompt plus generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub text: String,
    /// Instructions sent ahead of the prompt, in each vendor's system slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl PromptRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            system: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// The system instructions, if any non-blank ones were given.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Checks the caller-supplied input before any dispatch work happens.
    pub fn validate(&self) -> chorus_types::Result<()> {
        if self.text.trim().is_empty() {
            return Err(ChorusError::EmptyPrompt);
        }
        self.options.validate()
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Secret used to authenticate against one vendor. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
