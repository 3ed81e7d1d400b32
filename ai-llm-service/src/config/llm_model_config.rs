/// Configuration for one OpenAI-compatible chat model.
///
/// # Fields
///
/// - `model`: The model identifier sent with each request.
/// - `endpoint`: Base URL of the API, including any version prefix
///   (e.g. `https://api.openai.com/v1`). `/chat/completions` is appended.
/// - `api_key`: Bearer token; required by [`crate::OpenAiService::new`].
/// - `max_tokens`: Maximum number of tokens to generate (if supported).
/// - `temperature`: Controls randomness (0.0 = deterministic).
/// - `top_p`: Nucleus sampling cutoff.
/// - `timeout_secs`: Optional request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmModelConfig;
///
/// let cfg = LlmModelConfig {
///     model: "gpt-4o-mini".to_string(),
///     endpoint: "https://api.openai.com/v1".to_string(),
///     api_key: Some("sk-...".to_string()),
///     max_tokens: None,
///     temperature: Some(0.7),
///     top_p: Some(0.95),
///     timeout_secs: Some(120),
/// };
/// assert_eq!(cfg.chat_url(), "https://api.openai.com/v1/chat/completions");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// Model identifier string.
    pub model: String,

    /// OpenAI-style base URL.
    pub endpoint: String,

    /// API key for bearer authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Full URL of the chat-completions route for this endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim().trim_end_matches('/'))
    }
}
