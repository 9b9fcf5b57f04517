//! Concurrent fan-out of one prompt to many providers.
//!
//! Every requested provider moves through `Pending` and then either
//! `CredentialMissing` or `CredentialResolved` before reaching `Completed`.
//! Calls run concurrently on the caller's runtime; dropping the future
//! returned by [`Dispatcher::run`] cancels every in-flight call.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use chorus_llm::{
    AdapterRegistry, CredentialResolver, GenerationOptions, PromptRequest, ProviderSpec,
    ResolvedTarget, DEFAULT_REQUEST_TIMEOUT,
};
use chorus_types::{ChorusError, ProviderFailure, ProviderResult, Result};

use crate::report::{DispatchReport, ReportEntry};

// ---------------------------------------------------------------------------
// Per-provider state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderState {
    Pending,
    CredentialMissing,
    CredentialResolved,
    Completed,
}

/// Tracks one provider's progress through a dispatch.
struct ProviderRun<'a> {
    spec: &'a ProviderSpec,
    state: ProviderState,
}

impl<'a> ProviderRun<'a> {
    fn new(spec: &'a ProviderSpec) -> Self {
        Self {
            spec,
            state: ProviderState::Pending,
        }
    }

    fn advance(&mut self, next: ProviderState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (ProviderState::Pending, ProviderState::CredentialMissing)
                    | (ProviderState::Pending, ProviderState::CredentialResolved)
                    | (ProviderState::Pending, ProviderState::Completed)
                    | (ProviderState::CredentialMissing, ProviderState::Completed)
                    | (ProviderState::CredentialResolved, ProviderState::Completed)
            ),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(spec = %self.spec, from = ?self.state, to = ?next, "Provider state");
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends one prompt to every selected provider and collects a result for
/// each, in selection order.
pub struct Dispatcher {
    registry: AdapterRegistry,
    credentials: CredentialResolver,
    timeout: Duration,
    default_options: GenerationOptions,
}

impl Dispatcher {
    pub fn new(registry: AdapterRegistry, credentials: CredentialResolver) -> Self {
        Self {
            registry,
            credentials,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            default_options: GenerationOptions::default(),
        }
    }

    /// Upper bound on each provider call. An elapsed call becomes a
    /// `Transport` failure for that provider only. Must be non-zero;
    /// [`Dispatcher::run`] rejects a zero timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Options used by [`Dispatcher::dispatch`], and to fill fields a
    /// request passed to [`Dispatcher::run`] leaves unset.
    pub fn with_default_options(mut self, options: GenerationOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Convenience over [`Dispatcher::run`] for a bare prompt string.
    pub async fn dispatch(
        &self,
        prompt: &str,
        providers: &[ProviderSpec],
    ) -> Result<DispatchReport> {
        self.run(PromptRequest::new(prompt), providers).await
    }

    /// Run one dispatch.
    ///
    /// Fails only on caller input (empty prompt, no providers, invalid
    /// options), before any credential lookup or network call. Every other
    /// problem is recorded on the affected provider's entry.
    pub async fn run(
        &self,
        request: PromptRequest,
        providers: &[ProviderSpec],
    ) -> Result<DispatchReport> {
        let request = self.apply_defaults(request);
        request.validate()?;
        if self.timeout.is_zero() {
            return Err(ChorusError::InvalidOption {
                name: "timeout".into(),
                message: "must be greater than zero".into(),
            });
        }
        if providers.is_empty() {
            return Err(ChorusError::NoProviders);
        }

        let selection = dedupe(providers);
        let id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %id, providers = selection.len());

        let report = async {
            tracing::info!(requested = providers.len(), "Dispatch started");

            // Variants are bound before any call starts.
            let plan: Vec<_> = selection
                .iter()
                .map(|spec| (*spec, self.registry.resolve(spec)))
                .collect();

            let entries = join_all(
                plan.into_iter()
                    .map(|(spec, target)| self.run_one(spec, target, &request)),
            )
            .await;

            let report = DispatchReport::new(id, entries);
            tracing::info!(
                succeeded = report.success_count(),
                failed = report.len() - report.success_count(),
                "Dispatch finished"
            );
            report
        }
        .instrument(span)
        .await;
        Ok(report)
    }

    fn apply_defaults(&self, mut request: PromptRequest) -> PromptRequest {
        if request.options.max_tokens.is_none() {
            request.options.max_tokens = self.default_options.max_tokens;
        }
        if request.options.temperature.is_none() {
            request.options.temperature = self.default_options.temperature;
        }
        request
    }

    async fn run_one(
        &self,
        spec: &ProviderSpec,
        target: std::result::Result<ResolvedTarget, ProviderFailure>,
        request: &PromptRequest,
    ) -> ReportEntry {
        let mut run = ProviderRun::new(spec);

        let target = match target {
            Ok(target) => target,
            Err(failure) => {
                run.advance(ProviderState::Completed);
                return finish(spec, spec.to_string(), None, failure.into());
            }
        };
        let label = target.variant.label.clone();
        let model = target.variant.model.clone();

        let credential = match self.credentials.resolve(spec.vendor) {
            Ok(credential) => {
                run.advance(ProviderState::CredentialResolved);
                credential
            }
            Err(failure) => {
                run.advance(ProviderState::CredentialMissing);
                run.advance(ProviderState::Completed);
                return finish(spec, label, Some(model), failure.into());
            }
        };

        let call = AssertUnwindSafe(target.adapter.generate(&model, request, &credential))
            .catch_unwind();
        let result: ProviderResult = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(outcome)) => outcome.into(),
            Ok(Err(payload)) => {
                tracing::error!(spec = %spec, "Adapter panicked");
                ProviderFailure::internal(format!("adapter panicked: {}", panic_message(&*payload)))
                    .into()
            }
            Err(_) => ProviderFailure::transport(format!(
                "no response within {:?}",
                self.timeout
            ))
            .into(),
        };

        run.advance(ProviderState::Completed);
        finish(spec, label, Some(model), result)
    }
}

fn finish(
    spec: &ProviderSpec,
    label: String,
    model: Option<String>,
    result: ProviderResult,
) -> ReportEntry {
    match &result {
        ProviderResult::Success { text } => {
            tracing::debug!(spec = %spec, chars = text.len(), "Provider succeeded");
        }
        ProviderResult::Failure { kind, message } => {
            tracing::warn!(spec = %spec, kind = %kind, error = %message, "Provider failed");
        }
    }
    ReportEntry {
        spec: spec.clone(),
        label,
        model,
        result,
    }
}

/// Keep the first occurrence of each spec, preserving order.
fn dedupe(providers: &[ProviderSpec]) -> Vec<&ProviderSpec> {
    let mut seen = HashSet::new();
    providers.iter().filter(|spec| seen.insert(*spec)).collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
