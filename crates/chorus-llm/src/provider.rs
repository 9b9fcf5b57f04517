use async_trait::async_trait;
use std::sync::Arc;

use chorus_types::ProviderFailure;

use crate::{Credential, PromptRequest, Vendor};

// ---------------------------------------------------------------------------
// ProviderAdapter
// ---------------------------------------------------------------------------

/// Translates a normalized prompt into one vendor's wire contract and the
/// vendor's reply back into a single text string.
///
/// Implementations must classify every failure into a
/// [`FailureKind`](chorus_types::FailureKind); they never panic on vendor
/// input.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn generate(
        &self,
        model: &str,
        prompt: &PromptRequest,
        credential: &Credential,
    ) -> Result<String, ProviderFailure>;
}

pub type DynAdapter = Arc<dyn ProviderAdapter>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_types::FailureKind;
    use std::collections::HashMap;

    struct EchoAdapter;

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        fn vendor(&self) -> Vendor {
            Vendor::OpenAi
        }

        async fn generate(
            &self,
            model: &str,
            prompt: &PromptRequest,
            _credential: &Credential,
        ) -> Result<String, ProviderFailure> {
            if prompt.text == "fail" {
                return Err(ProviderFailure::api_error("refused"));
            }
            Ok(format!("{model}: {}", prompt.text))
        }
    }

    #[tokio::test]
    async fn dyn_adapter_generate() {
        let adapter: DynAdapter = Arc::new(EchoAdapter);
        let cred = Credential::new("k");
        let text = adapter
            .generate("m1", &PromptRequest::new("hi"), &cred)
            .await
            .unwrap();
        assert_eq!(text, "m1: hi");

        let err = adapter
            .generate("m1", &PromptRequest::new("fail"), &cred)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::ApiError);
    }

    #[tokio::test]
    async fn dyn_adapter_in_hashmap() {
        let mut adapters: HashMap<Vendor, DynAdapter> = HashMap::new();
        adapters.insert(Vendor::OpenAi, Arc::new(EchoAdapter));

        let adapter = adapters.get(&Vendor::OpenAi).unwrap();
        assert_eq!(adapter.vendor(), Vendor::OpenAi);
        let text = adapter
            .generate("m2", &PromptRequest::new("yo"), &Credential::new("k"))
            .await
            .unwrap();
        assert_eq!(text, "m2: yo");
    }
}
