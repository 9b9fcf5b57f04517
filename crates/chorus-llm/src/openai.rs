use async_trait::async_trait;
use serde_json::{json, Value};

use chorus_types::ProviderFailure;

use crate::http::{extract_text, send_json};
use crate::{Credential, PromptRequest, ProviderAdapter, Vendor, VendorProfile};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const TEXT_POINTER: &str = "/choices/0/message/content";

// ---------------------------------------------------------------------------
// OpenAiAdapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    client: reqwest::Client,
    base_url: String,
    text_pointer: &'static str,
}

impl OpenAiAdapter {
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

/// Chat-completions message list: optional system message, then the user turn.
pub(crate) fn chat_messages(prompt: &PromptRequest) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompt.system_prompt() {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": prompt.text }));
    Value::Array(messages)
}

fn build_request_body(model: &str, prompt: &PromptRequest) -> Value {
    let mut body = json!({
        "model": model,
        "messages": chat_messages(prompt),
    });

    if let Some(max_tokens) = prompt.options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temp) = prompt.options.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

// ---------------------------------------------------------------------------
// ProviderAdapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAi
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
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(credential.expose())
            .header("content-type", "application/json")
            .json(&body);

        let json = send_json(Vendor::OpenAi, request).await?;
        extract_text(&json, self.text_pointer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
