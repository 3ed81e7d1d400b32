//! Shared LLM access for the review-comment evaluator.
//!
//! The crate wraps a single OpenAI-compatible chat-completion endpoint and the
//! environment-driven configuration for the two matcher roles:
//!
//! - **llm**       → `LLM_MODEL_URL` / `LLM_API_KEY` / `LLM_MODEL`
//! - **embedding** → `EMBEDDING_MODEL_URL` / `EMBEDDING_API_KEY` / `EMBEDDING_MODEL`
//!
//! Construct an [`OpenAiService`] once per process (or batch run) and lend it
//! by reference to concurrent evaluations; the inner HTTP client pools
//! connections.

pub mod config;
pub mod error_handler;
pub mod services;
pub mod telemetry;

pub use config::default_config::{config_embedding_matcher, config_llm_matcher};
pub use config::llm_model_config::LlmModelConfig;
pub use error_handler::{AiLlmError, Result};
pub use services::open_ai_service::OpenAiService;
