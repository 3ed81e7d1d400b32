//! Prompt-based matcher backed by a chat model (`LLM_*` variables).

use ai_llm_service::{OpenAiService, config_llm_matcher};

use super::{SemanticMatcher, Verdict, compare_with_service};
use crate::errors::EvalResult;

#[derive(Debug)]
pub struct LlmMatcher {
    service: OpenAiService,
}

impl LlmMatcher {
    pub fn new(service: OpenAiService) -> Self {
        Self { service }
    }

    /// Reads `LLM_MODEL_URL`, `LLM_API_KEY`, `LLM_MODEL` and the shared
    /// `MATCHER_*` knobs.
    pub fn from_env() -> EvalResult<Self> {
        let cfg = config_llm_matcher()?;
        Ok(Self::new(OpenAiService::new(cfg)?))
    }

    pub fn model(&self) -> &str {
        self.service.model()
    }
}

impl SemanticMatcher for LlmMatcher {
    async fn compare(&self, generated: &str, reference: &str) -> Verdict {
        compare_with_service(&self.service, generated, reference).await
    }
}
