use async_trait::async_trait;
use serde_json::{json, Value};

use chorus_types::ProviderFailure;

use crate::http::{extract_text, send_json};
use crate::openai::chat_messages;
use crate::{Credential, PromptRequest, ProviderAdapter, Vendor, VendorProfile};

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const TEXT_POINTER: &str = "/choices/0/message/content";

// ---------------------------------------------------------------------------
// PerplexityAdapter
// ---------------------------------------------------------------------------

/// Plain HTTP POST against Perplexity's chat endpoint. Search-backed answers
/// carry a `citations` list, which is appended to the text as numbered
/// sources.
#[derive(Debug, Clone)]
pub struct PerplexityAdapter {
    client: reqwest::Client,
    base_url: String,
    text_pointer: &'static str,
}

impl PerplexityAdapter {
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

fn append_citations(text: String, json: &Value) -> String {
    let citations: Vec<&str> = json["citations"]
        .as_array()
        .map(|c| c.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if citations.is_empty() {
        return text;
    }

    let mut out = text;
    out.push_str("\n\nSources:");
    for (i, url) in citations.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}", i + 1, url));
    }
    out
}

#[async_trait]
impl ProviderAdapter for PerplexityAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Perplexity
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
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential.expose())
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .json(&body);

        let json = send_json(Vendor::Perplexity, request).await?;
        let text = extract_text(&json, self.text_pointer)?;
        Ok(append_citations(text, &json))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
