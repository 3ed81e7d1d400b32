//! Default matcher configs loaded strictly from environment variables.
//!
//! Two roles share one shape and differ only in the variables they read:
//!
//! - **llm**       → chat model used as the prompt-based comment comparator
//! - **embedding** → embedding-family model served behind the same chat contract
//!
//! # Environment variables
//!
//! Per role (all mandatory when the role is selected):
//! - `LLM_MODEL_URL`, `LLM_API_KEY`, `LLM_MODEL`
//! - `EMBEDDING_MODEL_URL`, `EMBEDDING_API_KEY`, `EMBEDDING_MODEL`
//!
//! Shared knobs (optional):
//! - `MATCHER_TEMPERATURE` = f32, default `0.7`
//! - `MATCHER_TOP_P`       = f32, default `0.95`
//! - `MATCHER_MAX_TOKENS`  = u32, unset means provider default
//! - `MATCHER_TIMEOUT_SECS` = u64, default `120`

use crate::{
    config::llm_model_config::LlmModelConfig,
    error_handler::{
        AiLlmError, ConfigError, parse_opt_f32, parse_opt_u32, parse_opt_u64, validate_http_endpoint,
        validate_range_f32,
    },
};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 0.95;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Variable names for one matcher role.
struct RoleVars {
    url: &'static str,
    key: &'static str,
    model: &'static str,
}

const LLM_VARS: RoleVars = RoleVars {
    url: "LLM_MODEL_URL",
    key: "LLM_API_KEY",
    model: "LLM_MODEL",
};

const EMBEDDING_VARS: RoleVars = RoleVars {
    url: "EMBEDDING_MODEL_URL",
    key: "EMBEDDING_API_KEY",
    model: "EMBEDDING_MODEL",
};

/// Constructs the config for the **llm** matcher from the process environment.
///
/// # Errors
/// - [`ConfigError::MissingVar`] if any of the three role variables is unset
/// - [`ConfigError::InvalidFormat`] if the URL lacks an http(s) scheme
/// - [`ConfigError::InvalidNumber`] / [`ConfigError::OutOfRange`] for bad knobs
pub fn config_llm_matcher() -> Result<LlmModelConfig, AiLlmError> {
    matcher_config(&LLM_VARS, env_lookup)
}

/// Constructs the config for the **embedding** matcher from the process environment.
///
/// Same rules as [`config_llm_matcher`], reading the `EMBEDDING_*` variables.
pub fn config_embedding_matcher() -> Result<LlmModelConfig, AiLlmError> {
    matcher_config(&EMBEDDING_VARS, env_lookup)
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn matcher_config<F>(vars: &RoleVars, lookup: F) -> Result<LlmModelConfig, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |name: &'static str| -> Result<String, AiLlmError> {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingVar(name).into())
    };

    let endpoint = required(vars.url)?;
    validate_http_endpoint(vars.url, &endpoint)?;
    let api_key = required(vars.key)?;
    let model = required(vars.model)?;

    let temperature = parse_opt_f32("MATCHER_TEMPERATURE", lookup("MATCHER_TEMPERATURE"))?
        .unwrap_or(DEFAULT_TEMPERATURE);
    validate_range_f32("temperature", temperature, 0.0, 2.0)?;
    let top_p = parse_opt_f32("MATCHER_TOP_P", lookup("MATCHER_TOP_P"))?.unwrap_or(DEFAULT_TOP_P);
    validate_range_f32("top_p", top_p, 0.0, 1.0)?;
    let max_tokens = parse_opt_u32("MATCHER_MAX_TOKENS", lookup("MATCHER_MAX_TOKENS"))?;
    let timeout_secs = parse_opt_u64("MATCHER_TIMEOUT_SECS", lookup("MATCHER_TIMEOUT_SECS"))?
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(LlmModelConfig {
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(temperature),
        top_p: Some(top_p),
        timeout_secs: Some(timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn llm_role_with_defaults() {
        let cfg = matcher_config(
            &LLM_VARS,
            lookup_from(&[
                ("LLM_MODEL_URL", "https://llm.local/v1"),
                ("LLM_API_KEY", "k"),
                ("LLM_MODEL", "judge"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.model, "judge");
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.temperature, Some(0.7));
        assert_eq!(cfg.top_p, Some(0.95));
        assert_eq!(cfg.max_tokens, None);
        assert_eq!(cfg.timeout_secs, Some(120));
    }

    #[test]
    fn embedding_role_reads_its_own_vars() {
        let cfg = matcher_config(
            &EMBEDDING_VARS,
            lookup_from(&[
                ("LLM_MODEL_URL", "https://llm.local/v1"),
                ("EMBEDDING_MODEL_URL", "http://emb.local/v1"),
                ("EMBEDDING_API_KEY", "e"),
                ("EMBEDDING_MODEL", "emb-judge"),
                ("MATCHER_MAX_TOKENS", "256"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.endpoint, "http://emb.local/v1");
        assert_eq!(cfg.model, "emb-judge");
        assert_eq!(cfg.max_tokens, Some(256));
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let err = matcher_config(
            &LLM_VARS,
            lookup_from(&[("LLM_MODEL_URL", "https://llm.local/v1"), ("LLM_MODEL", "m")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AiLlmError::Config(ConfigError::MissingVar("LLM_API_KEY"))
        ));
    }

    #[test]
    fn rejects_endpoint_without_scheme() {
        let err = matcher_config(
            &LLM_VARS,
            lookup_from(&[
                ("LLM_MODEL_URL", "llm.local"),
                ("LLM_API_KEY", "k"),
                ("LLM_MODEL", "m"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AiLlmError::Config(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn rejects_bad_temperature() {
        let err = matcher_config(
            &LLM_VARS,
            lookup_from(&[
                ("LLM_MODEL_URL", "https://llm.local/v1"),
                ("LLM_API_KEY", "k"),
                ("LLM_MODEL", "m"),
                ("MATCHER_TEMPERATURE", "hot"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AiLlmError::Config(ConfigError::InvalidNumber { .. })
        ));
    }
}
