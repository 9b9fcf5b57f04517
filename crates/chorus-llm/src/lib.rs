//! Provider adapters for chorus (OpenAI, Anthropic, Gemini, Perplexity).
//!
//! Provides the `ProviderAdapter` trait, the model `Catalog`, credential
//! resolution, and `AdapterRegistry` for binding `vendor/variant` specs to
//! adapters.

mod anthropic;
mod catalog;
mod credentials;
mod gemini;
mod http;
mod openai;
mod perplexity;
mod provider;
mod registry;
mod retry;
mod types;

pub use anthropic::{AnthropicAdapter, DEFAULT_MAX_TOKENS};
pub use catalog::*;
pub use credentials::*;
pub use gemini::GeminiAdapter;
pub use http::{build_client, DEFAULT_REQUEST_TIMEOUT};
pub use openai::OpenAiAdapter;
pub use perplexity::PerplexityAdapter;
pub use provider::*;
pub use registry::*;
pub use retry::*;
pub use types::*;
