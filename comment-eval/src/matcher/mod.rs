//! Semantic matcher: decides whether two review notes raise the same concern.
//!
//! One capability, [`SemanticMatcher::compare`], two interchangeable backends:
//!
//! - [`LlmMatcher`]       prompt-based chat model
//! - [`EmbeddingMatcher`] embedding-family model behind the same chat contract
//!
//! Both own only their connection (an [`OpenAiService`]) and delegate to the
//! shared prompt/verdict pipeline in [`prompt`]. [`SemanticMatcherClient`]
//! picks one at startup; it is built once and lent read-only to every
//! evaluation of a batch.
//!
//! Classifier failures never escape: they come back as a negative [`Verdict`]
//! whose reason starts with `ERROR:`.

pub mod embedding;
pub mod llm;
pub mod prompt;

use std::future::Future;
use std::time::Instant;

use ai_llm_service::OpenAiService;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SemanticMatcherType;
use crate::errors::EvalResult;

pub use embedding::EmbeddingMatcher;
pub use llm::LlmMatcher;
pub use prompt::{build_prompt, parse_similarity_response};

/// Outcome of one classifier call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub is_similar: bool,
    pub reason: String,
    pub raw_response: Option<String>,
}

impl Verdict {
    /// Interprets a model answer. Reason and raw response are both the
    /// trimmed, lower-cased answer.
    pub fn from_response(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        Self {
            is_similar: parse_similarity_response(&normalized),
            reason: normalized.clone(),
            raw_response: Some(normalized),
        }
    }

    /// Negative verdict carrying the failure.
    pub fn from_error(err: impl std::fmt::Display) -> Self {
        Self {
            is_similar: false,
            reason: format!("ERROR: {err}"),
            raw_response: None,
        }
    }
}

/// Async text-pair classifier.
///
/// Implementations must not fail: transport or model errors are reported
/// through [`Verdict::from_error`].
pub trait SemanticMatcher: Send + Sync {
    fn compare(&self, generated: &str, reference: &str) -> impl Future<Output = Verdict> + Send;
}

/// The backend selected by configuration.
#[derive(Debug)]
pub enum SemanticMatcherClient {
    Llm(LlmMatcher),
    Embedding(EmbeddingMatcher),
}

impl SemanticMatcherClient {
    /// Builds the backend for `kind` from its `*_MODEL_URL` / `*_API_KEY` /
    /// `*_MODEL` environment variables.
    ///
    /// # Errors
    /// [`crate::Error::Llm`] when credentials are missing or invalid.
    pub fn from_env(kind: SemanticMatcherType) -> EvalResult<Self> {
        let client = match kind {
            SemanticMatcherType::Llm => Self::Llm(LlmMatcher::from_env()?),
            SemanticMatcherType::Embedding => Self::Embedding(EmbeddingMatcher::from_env()?),
        };
        debug!(matcher = kind.as_str(), model = client.model(), "semantic matcher ready");
        Ok(client)
    }

    pub fn kind(&self) -> SemanticMatcherType {
        match self {
            Self::Llm(_) => SemanticMatcherType::Llm,
            Self::Embedding(_) => SemanticMatcherType::Embedding,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Llm(m) => m.model(),
            Self::Embedding(m) => m.model(),
        }
    }
}

impl SemanticMatcher for SemanticMatcherClient {
    async fn compare(&self, generated: &str, reference: &str) -> Verdict {
        match self {
            Self::Llm(m) => m.compare(generated, reference).await,
            Self::Embedding(m) => m.compare(generated, reference).await,
        }
    }
}

/// Prompt → model → verdict, shared by both backends.
pub(crate) async fn compare_with_service(
    service: &OpenAiService,
    generated: &str,
    reference: &str,
) -> Verdict {
    let started = Instant::now();
    let prompt = build_prompt(generated, reference);

    match service.generate(&prompt).await {
        Ok(answer) => {
            let verdict = Verdict::from_response(&answer);
            debug!(
                model = service.model(),
                similar = verdict.is_similar,
                latency_ms = started.elapsed().as_millis(),
                "semantic comparison"
            );
            verdict
        }
        Err(e) => {
            warn!(
                model = service.model(),
                error = %e,
                latency_ms = started.elapsed().as_millis(),
                "semantic comparison failed"
            );
            Verdict::from_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_from_response_lowercases_and_trims() {
        let v = Verdict::from_response("  YES, same issue \n");
        assert!(v.is_similar);
        assert_eq!(v.reason, "yes, same issue");
        assert_eq!(v.raw_response.as_deref(), Some("yes, same issue"));
    }

    #[test]
    fn verdict_from_error_is_negative() {
        let v = Verdict::from_error("connection refused");
        assert!(!v.is_similar);
        assert_eq!(v.reason, "ERROR: connection refused");
        assert_eq!(v.raw_response, None);
    }

    #[test]
    fn verdict_serializes_null_raw_response() {
        let v = Verdict::from_error("boom");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["raw_response"], serde_json::Value::Null);
        assert_eq!(json["is_similar"], false);
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_error_verdict() {
        let service = OpenAiService::new(ai_llm_service::LlmModelConfig {
            model: "judge".into(),
            // Port 9 (discard) on loopback: connection is refused immediately.
            endpoint: "http://127.0.0.1:9/v1".into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(2),
        })
        .unwrap();
        let matcher = LlmMatcher::new(service);
        let v = matcher.compare("a", "b").await;
        assert!(!v.is_similar);
        assert!(v.reason.starts_with("ERROR: "));
        assert_eq!(v.raw_response, None);
    }
}
