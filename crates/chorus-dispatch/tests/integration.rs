//! End-to-end tests for the dispatch engine.
//!
//! Stub adapters count their invocations so tests can assert which providers
//! were actually called. Wire-level cases run the real HTTP adapters against
//! a local mockito server.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use chorus_dispatch::{format_report, render_text, Dispatcher, PanelBody};
use chorus_llm::{
    AdapterRegistry, Catalog, Credential, CredentialResolver, CredentialSource,
    GenerationOptions, PromptRequest, ProviderAdapter, ProviderSpec, StaticCredentials, Vendor,
};
use chorus_types::{ChorusError, FailureKind, ProviderFailure, ProviderResult};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Behavior {
    /// Reply with "<model>: <prompt> (max_tokens=..)", plus any system text.
    Echo,
    Fail(FailureKind),
    Panic,
    /// Sleep, then mark `finished` and reply.
    Stall(Duration, Arc<AtomicBool>),
}

struct StubAdapter {
    vendor: Vendor,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &PromptRequest,
        _credential: &Credential,
    ) -> Result<String, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Echo => {
                let mut reply = format!(
                    "{model}: {} (max_tokens={:?})",
                    prompt.text, prompt.options.max_tokens
                );
                if let Some(system) = prompt.system_prompt() {
                    reply.push_str(&format!(" [system: {system}]"));
                }
                Ok(reply)
            }
            Behavior::Fail(kind) => Err(ProviderFailure::new(*kind, "stub failure")),
            Behavior::Panic => panic!("stub adapter exploded"),
            Behavior::Stall(delay, finished) => {
                tokio::time::sleep(*delay).await;
                finished.store(true, Ordering::SeqCst);
                Ok("late".into())
            }
        }
    }
}

/// Credential source that counts lookups.
struct CountingSource {
    inner: StaticCredentials,
    lookups: Arc<AtomicUsize>,
}

impl CredentialSource for CountingSource {
    fn get(&self, key: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }
}

fn all_keys() -> StaticCredentials {
    StaticCredentials::new()
        .with("OPENAI_API_KEY", "sk-openai")
        .with("ANTHROPIC_API_KEY", "sk-ant")
        .with("GEMINI_API_KEY", "gm-key")
        .with("PERPLEXITY_API_KEY", "pplx-key")
}

/// Builder for a dispatcher backed by stub adapters.
struct Harness {
    catalog: Catalog,
    adapters: Vec<(Vendor, Behavior)>,
    credentials: StaticCredentials,
    calls: Arc<AtomicUsize>,
    lookups: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            adapters: Vendor::ALL.iter().map(|v| (*v, Behavior::Echo)).collect(),
            credentials: all_keys(),
            calls: Arc::new(AtomicUsize::new(0)),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn behave(mut self, vendor: Vendor, behavior: Behavior) -> Self {
        for slot in &mut self.adapters {
            if slot.0 == vendor {
                slot.1 = behavior.clone();
            }
        }
        self
    }

    fn credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    fn build(self) -> (Dispatcher, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let source = CountingSource {
            inner: self.credentials,
            lookups: self.lookups.clone(),
        };
        let resolver = CredentialResolver::new(source, &self.catalog);
        let mut registry = AdapterRegistry::new(self.catalog);
        for (vendor, behavior) in self.adapters {
            registry.register(StubAdapter {
                vendor,
                behavior,
                calls: self.calls.clone(),
            });
        }
        (Dispatcher::new(registry, resolver), self.calls, self.lookups)
    }
}

fn spec(s: &str) -> ProviderSpec {
    s.parse().expect("valid spec")
}

// ---------------------------------------------------------------------------
// Shape of the report
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_entry_per_distinct_provider_in_selection_order() {
    let (dispatcher, calls, _) = Harness::new().build();
    let selected = vec![
        spec("perplexity/sonar"),
        spec("openai/gpt-4-turbo"),
        spec("perplexity/sonar"),
        spec("anthropic/opus"),
        spec("openai/gpt-4-turbo"),
    ];

    let report = dispatcher.dispatch("Capital of France?", &selected).await.unwrap();

    let order: Vec<String> = report.iter().map(|e| e.spec.to_string()).collect();
    assert_eq!(
        order,
        vec!["perplexity/sonar", "openai/gpt-4-turbo", "anthropic/opus"]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.success_count(), 3);

    let first = &report.entries[0];
    assert_eq!(first.label, "Perplexity Sonar");
    assert_eq!(first.model.as_deref(), Some("sonar"));
    assert_eq!(
        first.result.text(),
        Some("sonar: Capital of France? (max_tokens=None)")
    );
}

#[tokio::test]
async fn specs_differing_only_in_case_collapse() {
    let (dispatcher, calls, _) = Harness::new().build();
    let selected = [
        ProviderSpec::new(Vendor::Anthropic, "Opus"),
        spec("anthropic/opus"),
    ];

    let report = dispatcher.dispatch("hi", &selected).await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.entries[0].spec.to_string(), "anthropic/opus");
    assert!(report.entries[0].result.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn every_catalog_variant_can_be_dispatched() {
    let (dispatcher, calls, _) = Harness::new().build();
    let all = Catalog::new().specs();

    let report = dispatcher.dispatch("hi", &all).await.unwrap();

    assert_eq!(report.len(), all.len());
    assert_eq!(calls.load(Ordering::SeqCst), all.len());
    assert!(report.iter().all(|e| e.result.is_success()));
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failure_does_not_affect_siblings() {
    let (dispatcher, _, _) = Harness::new()
        .behave(Vendor::OpenAi, Behavior::Fail(FailureKind::ApiError))
        .build();

    let report = dispatcher
        .dispatch("hello", &[spec("openai/gpt-3.5-turbo"), spec("anthropic/sonnet")])
        .await
        .unwrap();

    assert_eq!(report.entries[0].result.failure_kind(), Some(FailureKind::ApiError));
    assert_eq!(
        report.entries[1].result.text(),
        Some("claude-3-sonnet-20240229: hello (max_tokens=None)")
    );
}

#[tokio::test]
async fn panicking_adapter_is_reported_as_internal() {
    let (dispatcher, _, _) = Harness::new()
        .behave(Vendor::Google, Behavior::Panic)
        .build();

    let report = dispatcher
        .dispatch("hello", &[spec("google/gemini-pro"), spec("openai/gpt-4-turbo")])
        .await
        .unwrap();

    match &report.entries[0].result {
        ProviderResult::Failure { kind, message } => {
            assert_eq!(*kind, FailureKind::Internal);
            assert!(message.contains("stub adapter exploded"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.entries[1].result.is_success());
}

#[tokio::test]
async fn timeout_is_transport_failure() {
    let finished = Arc::new(AtomicBool::new(false));
    let (dispatcher, _, _) = Harness::new()
        .behave(
            Vendor::Perplexity,
            Behavior::Stall(Duration::from_secs(30), finished.clone()),
        )
        .build();
    let dispatcher = dispatcher.with_timeout(Duration::from_millis(50));

    let report = dispatcher
        .dispatch("hello", &[spec("perplexity/sonar-pro"), spec("anthropic/opus")])
        .await
        .unwrap();

    assert_eq!(report.entries[0].result.failure_kind(), Some(FailureKind::Transport));
    assert!(report.entries[1].result.is_success());
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn provider_calls_overlap() {
    let delay = Duration::from_millis(300);
    let finished = Arc::new(AtomicBool::new(false));
    let mut harness = Harness::new();
    for vendor in Vendor::ALL {
        harness = harness.behave(vendor, Behavior::Stall(delay, finished.clone()));
    }
    let (dispatcher, calls, _) = harness.build();
    let all = Catalog::new().specs();

    let started = tokio::time::Instant::now();
    let report = dispatcher.dispatch("hi", &all).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(calls.load(Ordering::SeqCst), all.len());
    assert!(report.iter().all(|e| e.result.text() == Some("late")));
    assert!(elapsed >= delay);
    assert!(
        elapsed < delay * 2,
        "{} calls of {delay:?} took {elapsed:?}",
        all.len()
    );
}

#[tokio::test]
async fn dropping_the_dispatch_cancels_in_flight_calls() {
    let finished = Arc::new(AtomicBool::new(false));
    let (dispatcher, calls, _) = Harness::new()
        .behave(
            Vendor::OpenAi,
            Behavior::Stall(Duration::from_millis(200), finished.clone()),
        )
        .build();

    let selected = [spec("openai/gpt-4-turbo")];
    let outcome =
        tokio::time::timeout(Duration::from_millis(20), dispatcher.dispatch("hi", &selected)).await;
    assert!(outcome.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

// ---------------------------------------------------------------------------
// Configuration failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_credential_never_calls_adapter() {
    let (dispatcher, calls, _) = Harness::new()
        .credentials(StaticCredentials::new().with("OPENAI_API_KEY", "sk-openai"))
        .build();

    let report = dispatcher
        .dispatch("hello", &[spec("anthropic/opus"), spec("openai/gpt-4-turbo")])
        .await
        .unwrap();

    match &report.entries[0].result {
        ProviderResult::Failure { kind, message } => {
            assert_eq!(*kind, FailureKind::MissingCredential);
            assert!(message.contains("ANTHROPIC_API_KEY"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.entries[1].result.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_credential_is_missing() {
    let (dispatcher, calls, _) = Harness::new()
        .credentials(all_keys().with("GEMINI_API_KEY", "   "))
        .build();

    let report = dispatcher
        .dispatch("hello", &[spec("google/gemini-ultra")])
        .await
        .unwrap();

    assert_eq!(
        report.entries[0].result.failure_kind(),
        Some(FailureKind::MissingCredential)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_variant_skips_credential_lookup() {
    let (dispatcher, calls, lookups) = Harness::new().build();

    let report = dispatcher
        .dispatch("hello", &[spec("openai/gpt-7")])
        .await
        .unwrap();

    let entry = &report.entries[0];
    assert_eq!(entry.result.failure_kind(), Some(FailureKind::UnknownVariant));
    assert_eq!(entry.label, "openai/gpt-7");
    assert!(entry.model.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Caller input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_prompt_fails_fast() {
    let (dispatcher, calls, lookups) = Harness::new().build();

    for prompt in ["", "   \n\t"] {
        let err = dispatcher
            .dispatch(prompt, &[spec("openai/gpt-4-turbo")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChorusError::EmptyPrompt));
        assert!(err.is_caller_input());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_selection_fails_fast() {
    let (dispatcher, calls, lookups) = Harness::new().build();

    let err = dispatcher.dispatch("hello", &[]).await.unwrap_err();

    assert!(matches!(err, ChorusError::NoProviders));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_timeout_fails_fast() {
    let (dispatcher, calls, lookups) = Harness::new().build();
    let dispatcher = dispatcher.with_timeout(Duration::ZERO);

    let err = dispatcher
        .dispatch("hello", &[spec("openai/gpt-4-turbo")])
        .await
        .unwrap_err();

    match &err {
        ChorusError::InvalidOption { name, .. } => assert_eq!(name, "timeout"),
        other => panic!("expected invalid option, got {other:?}"),
    }
    assert!(err.is_caller_input());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn system_prompt_reaches_adapter() {
    let (dispatcher, _, _) = Harness::new().build();

    let request = PromptRequest::new("hello").with_system("Be brief.");
    let report = dispatcher
        .run(request, &[spec("google/gemini-pro")])
        .await
        .unwrap();

    assert_eq!(
        report.entries[0].result.text(),
        Some("gemini-pro: hello (max_tokens=None) [system: Be brief.]")
    );
}

#[tokio::test]
async fn invalid_options_fail_fast() {
    let (dispatcher, calls, _) = Harness::new().build();

    let request =
        PromptRequest::new("hello").with_options(GenerationOptions::default().with_temperature(3.5));
    let err = dispatcher
        .run(request, &[spec("openai/gpt-4-turbo")])
        .await
        .unwrap_err();

    assert!(matches!(err, ChorusError::InvalidOption { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Options and determinism
// ---------------------------------------------------------------------------

#[tokio::test]
async fn default_options_fill_unset_fields() {
    let (dispatcher, _, _) = Harness::new().build();
    let dispatcher =
        dispatcher.with_default_options(GenerationOptions::default().with_max_tokens(256));

    let report = dispatcher
        .dispatch("hello", &[spec("openai/gpt-4-turbo")])
        .await
        .unwrap();
    assert_eq!(
        report.entries[0].result.text(),
        Some("gpt-4-turbo-preview: hello (max_tokens=Some(256))")
    );

    let explicit =
        PromptRequest::new("hello").with_options(GenerationOptions::default().with_max_tokens(64));
    let report = dispatcher
        .run(explicit, &[spec("openai/gpt-4-turbo")])
        .await
        .unwrap();
    assert_eq!(
        report.entries[0].result.text(),
        Some("gpt-4-turbo-preview: hello (max_tokens=Some(64))")
    );
}

#[tokio::test]
async fn repeated_dispatch_is_idempotent() {
    let (dispatcher, _, _) = Harness::new()
        .behave(Vendor::Anthropic, Behavior::Fail(FailureKind::MalformedResponse))
        .credentials(all_keys().with("PERPLEXITY_API_KEY", ""))
        .build();
    let selected = [
        spec("openai/gpt-4-turbo"),
        spec("anthropic/opus"),
        spec("perplexity/sonar"),
        spec("google/nope"),
    ];

    let first = dispatcher.dispatch("same prompt", &selected).await.unwrap();
    let second = dispatcher.dispatch("same prompt", &selected).await.unwrap();

    assert_eq!(first.entries, second.entries);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn report_formats_into_titled_panels() {
    let (dispatcher, _, _) = Harness::new()
        .credentials(StaticCredentials::new().with("OPENAI_API_KEY", "sk-openai"))
        .build();

    let report = dispatcher
        .dispatch("hello", &[spec("openai/gpt-3.5-turbo"), spec("google/gemini-pro")])
        .await
        .unwrap();
    let panels = format_report(&report);

    assert_eq!(panels[0].title(), "GPT-3.5 Turbo (best value) response");
    assert!(matches!(panels[0].body, PanelBody::Text(_)));
    match &panels[1].body {
        PanelBody::Error { category, detail } => {
            assert_eq!(category, "missing credential");
            assert!(detail.contains("GEMINI_API_KEY or GOOGLE_API_KEY"), "{detail}");
        }
        other => panic!("expected error panel, got {other:?}"),
    }

    let text = render_text(&panels);
    assert!(text.contains("Gemini Pro (best value) response"));
    assert!(text.contains("Error (missing credential)"));
}

// ---------------------------------------------------------------------------
// Wire-level classification against a local HTTP stub
// ---------------------------------------------------------------------------

async fn dispatch_openai_against(status: usize, body: &str) -> ProviderResult {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-openai")
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let mut catalog = Catalog::new();
    catalog.set_base_url(Vendor::OpenAi, server.url());
    let resolver = CredentialResolver::new(all_keys(), &catalog);
    let registry = AdapterRegistry::with_http_adapters(catalog, reqwest::Client::new());
    let dispatcher = Dispatcher::new(registry, resolver);

    let report = dispatcher
        .dispatch("hello", &[spec("openai/gpt-4-turbo")])
        .await
        .unwrap();
    mock.assert_async().await;
    report.entries[0].result.clone()
}

#[tokio::test]
async fn http_success_yields_text() {
    let result = dispatch_openai_against(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"Paris"}}]}"#,
    )
    .await;
    assert_eq!(result, ProviderResult::success("Paris"));
}

#[tokio::test]
async fn http_200_with_empty_choices_is_malformed() {
    let result = dispatch_openai_against(200, r#"{"choices":[]}"#).await;
    assert_eq!(result.failure_kind(), Some(FailureKind::MalformedResponse));
}

#[tokio::test]
async fn http_500_is_transport() {
    let result =
        dispatch_openai_against(500, r#"{"error":{"message":"upstream overloaded"}}"#).await;
    match result {
        ProviderResult::Failure { kind, message } => {
            assert_eq!(kind, FailureKind::Transport);
            assert!(message.contains("500"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn http_200_with_error_member_is_api_error() {
    let result = dispatch_openai_against(
        200,
        r#"{"error":{"message":"content policy violation","type":"invalid_request_error"}}"#,
    )
    .await;
    match result {
        ProviderResult::Failure { kind, message } => {
            assert_eq!(kind, FailureKind::ApiError);
            assert!(message.contains("content policy violation"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
