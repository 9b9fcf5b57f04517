use async_trait::async_trait;
use serde_json::json;

use chorus_types::ProviderFailure;

use crate::http::{extract_text, send_json};
use crate::{Credential, PromptRequest, ProviderAdapter, Vendor, VendorProfile};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TEXT_POINTER: &str = "/candidates/0/content/parts";

// ---------------------------------------------------------------------------
// GeminiAdapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    text_pointer: &'static str,
}

impl GeminiAdapter {
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
// Request translation
// ---------------------------------------------------------------------------

fn build_request_body(prompt: &PromptRequest) -> serde_json::Value {
    let mut body = json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt.text } ] }
        ],
    });

    if let Some(system) = prompt.system_prompt() {
        body["systemInstruction"] = json!({ "parts": [ { "text": system } ] });
    }

    let mut gen_config = json!({});
    if let Some(max_tokens) = prompt.options.max_tokens {
        gen_config["maxOutputTokens"] = json!(max_tokens);
    }
    if let Some(temp) = prompt.options.temperature {
        gen_config["temperature"] = json!(temp);
    }
    if gen_config.as_object().is_some_and(|o| !o.is_empty()) {
        body["generationConfig"] = gen_config;
    }

    body
}

/// A prompt rejected by safety filters comes back as 200 with
/// `promptFeedback.blockReason` and no candidates.
fn check_prompt_feedback(json: &serde_json::Value) -> Result<(), ProviderFailure> {
    let has_candidates = json["candidates"]
        .as_array()
        .is_some_and(|c| !c.is_empty());
    if has_candidates {
        return Ok(());
    }
    match json["promptFeedback"]["blockReason"].as_str() {
        Some(reason) => Err(ProviderFailure::api_error(format!(
            "prompt blocked: {reason}"
        ))),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// ProviderAdapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Google
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &PromptRequest,
        credential: &Credential,
    ) -> Result<String, ProviderFailure> {
        let body = build_request_body(prompt);

        // Key goes in a header, not the query string, so it never shows up in
        // transport error text.
        let request = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", credential.expose())
            .header("content-type", "application/json")
            .json(&body);

        let json = send_json(Vendor::Google, request).await?;
        check_prompt_feedback(&json)?;
        extract_text(&json, self.text_pointer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
