use async_trait::async_trait;
use serde_json::json;

use chorus_types::ProviderFailure;

use crate::http::{extract_text, send_json};
use crate::{Credential, PromptRequest, ProviderAdapter, Vendor, VendorProfile};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const TEXT_POINTER: &str = "/content/0/text";
const API_VERSION: &str = "2023-06-01";

/// The messages API requires `max_tokens`; used when the caller sets none.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Upper bound of Anthropic's temperature range.
const MAX_TEMPERATURE: f32 = 1.0;

// ---------------------------------------------------------------------------
// AnthropicAdapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
    text_pointer: &'static str,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_pointer: TEXT_POINTER,
        }
    }

    pub fn from_profile(client: reqwest::Client, profile: &VendorProfile) -> Self {
        Self {
            client,
            base_url: profile.base_url.clone(),
            text_pointer: profile.text_pointer,
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

// ---------------------------------------------------------------------------
// Request translation (prompt → Anthropic JSON)
// ---------------------------------------------------------------------------

fn build_request_body(model: &str, prompt: &PromptRequest) -> serde_json::Value {
    let mut body = json!({
        "model": model,
        "max_tokens": prompt.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": [
            { "role": "user", "content": prompt.text }
        ],
    });

    if let Some(system) = prompt.system_prompt() {
        body["system"] = json!(system);
    }
    if let Some(temp) = prompt.options.temperature {
        if temp > MAX_TEMPERATURE {
            tracing::debug!(requested = temp, "Clamping temperature to Anthropic range");
        }
        body["temperature"] = json!(temp.min(MAX_TEMPERATURE));
    }

    body
}

// ---------------------------------------------------------------------------
// ProviderAdapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &PromptRequest,
        credential: &Credential,
    ) -> Result<String, ProviderFailure> {
        let body = build_request_body(model, prompt);

        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", credential.expose())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let json = send_json(Vendor::Anthropic, request).await?;
        extract_text(&json, self.text_pointer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
