use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the LLM credential.
pub const CREDENTIAL_VAR: &str = "HF_TOKEN";

#[derive(Debug, Clone)]
pub struct Config {
    pub hf_token: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub wikipedia_lang: String,
    pub top_k: usize,
    pub max_context_chars: usize,
    pub word_limit: usize,
    pub max_compression_attempts: u32,
    pub request_timeout: Duration,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            // An empty token is as good as none.
            hf_token: get(CREDENTIAL_VAR).filter(|t| !t.trim().is_empty()),
            llm_base_url: get("LLM_BASE_URL")
                .unwrap_or_else(|| "https://router.huggingface.co/v1".into()),
            llm_model: get("LLM_MODEL")
                .unwrap_or_else(|| "moonshotai/Kimi-K2-Instruct-0905".into()),
            wikipedia_lang: get("WIKIPEDIA_LANG").unwrap_or_else(|| "en".into()),
            top_k: parse_or(&get, "TOP_K", 5)?,
            max_context_chars: parse_or(&get, "MAX_CONTEXT_CHARS", 12_000)?,
            word_limit: parse_or(&get, "WORD_LIMIT", 500)?,
            max_compression_attempts: parse_or(&get, "MAX_COMPRESSION_ATTEMPTS", 1)?,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 60)?),
            log_dir: get("LOG_DIR").unwrap_or_else(|| "logs".into()),
        };

        anyhow::ensure!(config.top_k > 0, "TOP_K must be at least 1");
        anyhow::ensure!(config.word_limit > 0, "WORD_LIMIT must be at least 1");
        anyhow::ensure!(
            config.max_compression_attempts > 0,
            "MAX_COMPRESSION_ATTEMPTS must be at least 1"
        );
        anyhow::ensure!(
            !config.request_timeout.is_zero(),
            "REQUEST_TIMEOUT_SECS must be at least 1"
        );

        Ok(config)
    }

    pub fn has_credential(&self) -> bool {
        self.hf_token.is_some()
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number", key)),
        None => Ok(default),
    }
}
