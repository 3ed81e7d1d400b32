//! Matcher backed by an embedding-family model (`EMBEDDING_*` variables).
//!
//! The model is served behind the same chat-completion contract as
//! [`super::LlmMatcher`], so the prompt and verdict parsing are shared; only
//! the connection differs.

use ai_llm_service::{OpenAiService, config_embedding_matcher};

use super::{SemanticMatcher, Verdict, compare_with_service};
use crate::errors::EvalResult;

#[derive(Debug)]
pub struct EmbeddingMatcher {
    service: OpenAiService,
}

impl EmbeddingMatcher {
    pub fn new(service: OpenAiService) -> Self {
        Self { service }
    }

    pub fn from_env() -> EvalResult<Self> {
        let cfg = config_embedding_matcher()?;
        Ok(Self::new(OpenAiService::new(cfg)?))
    }

    pub fn model(&self) -> &str {
        self.service.model()
    }
}

impl SemanticMatcher for EmbeddingMatcher {
    async fn compare(&self, generated: &str, reference: &str) -> Verdict {
        compare_with_service(&self.service, generated, reference).await
    }
}
