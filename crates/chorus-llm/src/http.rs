//! Response classification shared by every HTTP adapter.
//!
//! - connection failure, timeout, non-2xx status → `Transport`
//! - 2xx with an `error` member in the JSON body → `ApiError`
//! - 2xx that is not JSON or lacks text at the expected pointer → `MalformedResponse`

use std::time::Duration;

use serde_json::Value;

use chorus_types::ProviderFailure;

use crate::Vendor;

/// Longest vendor detail message carried into a failure.
const MAX_DETAIL_CHARS: usize = 500;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the HTTP client shared by all adapters of a registry.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Send a prepared request and return the parsed JSON body of a successful,
/// error-free response.
pub(crate) async fn send_json(
    vendor: Vendor,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderFailure> {
    let resp = request.send().await.map_err(|e| map_send_error(vendor, e))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| map_send_error(vendor, e))?;

    if !status.is_success() {
        tracing::debug!(vendor = %vendor, status = status.as_u16(), "Non-success status");
        return Err(ProviderFailure::transport(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate(&extract_error_message(&body))
        )));
    }

    classify_success_body(&body)
}

/// Classify the body of a 2xx response.
pub(crate) fn classify_success_body(body: &str) -> Result<Value, ProviderFailure> {
    let json: Value = serde_json::from_str(body).map_err(|e| {
        ProviderFailure::malformed(format!("response is not valid JSON: {e}"))
    })?;

    if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
        return Err(ProviderFailure::api_error(truncate(&error_detail(error))));
    }

    Ok(json)
}

/// Pull the generated text out of a response by JSON pointer.
///
/// The pointer may name a string, or an array of parts whose `text` members
/// are concatenated in order.
pub(crate) fn extract_text(json: &Value, pointer: &str) -> Result<String, ProviderFailure> {
    match json.pointer(pointer) {
        Some(Value::String(text)) => return Ok(text.clone()),
        Some(Value::Array(parts)) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                return Err(ProviderFailure::malformed(format!(
                    "no text parts at {pointer}"
                )));
            }
            return Ok(texts.concat());
        }
        _ => {}
    }

    let top = pointer.trim_start_matches('/').split('/').next().unwrap_or("");
    let message = match json.get(top) {
        None => format!("response has no '{top}' field"),
        Some(Value::Array(items)) if items.is_empty() => format!("'{top}' is empty"),
        Some(_) => format!("response has no text at {pointer}"),
    };
    Err(ProviderFailure::malformed(message))
}

fn map_send_error(vendor: Vendor, e: reqwest::Error) -> ProviderFailure {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e.without_url())
    } else {
        e.without_url().to_string()
    };
    tracing::debug!(vendor = %vendor, error = %message, "Transport failure");
    ProviderFailure::transport(message)
}

/// Vendor-supplied detail from an error body, or the raw body.
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").map(error_detail))
        .unwrap_or_else(|| body.trim().to_string())
}

fn error_detail(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_DETAIL_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_DETAIL_CHARS).collect();
    out.push('…');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
