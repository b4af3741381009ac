use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::bounded;
use super::words::word_count;
use crate::config::{Config, CREDENTIAL_VAR};
use crate::error::{LlmError, ReportError};
use crate::llm::{ChatMessage, ChatModel, LlmResponse};

fn report_prompt(word_limit: usize, topic: &str, context: &str) -> String {
    format!(
        r#"
You are a market research assistant for a business analyst at a large corporation.

Write an industry report UNDER {word_limit} words.
Use ONLY the information in the sources below (Wikipedia pages).
If the sources do not contain an answer, say so.
When stating facts, cite sources like [Source 1], [Source 2], etc.

Industry: {topic}

Sources:
{context}
"#
    )
}

fn compress_prompt(word_limit: usize, topic: &str, report: &str) -> String {
    format!(
        r#"
Compress the report below to UNDER {word_limit} words.
Keep it factual and keep the [Source #] citations.
Do not add new information.

Industry: {topic}

REPORT:
{report}
"#
    )
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub credential: Option<String>,
    pub model: String,
    pub word_limit: usize,
    pub max_compression_attempts: u32,
    pub request_timeout: Duration,
}

impl From<&Config> for GeneratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            credential: config.hf_token.clone(),
            model: config.llm_model.clone(),
            word_limit: config.word_limit,
            max_compression_attempts: config.max_compression_attempts,
            request_timeout: config.request_timeout,
        }
    }
}

/// Text produced by one or more LLM calls, with the usage they reported.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub compression_passes: u32,
}

impl Generation {
    fn absorb(&mut self, response: &LlmResponse) {
        self.input_tokens += response.input_tokens;
        self.output_tokens += response.output_tokens;
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub word_count: usize,
    pub compression_passes: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

pub struct ReportGenerator {
    llm: Arc<dyn ChatModel>,
    config: GeneratorConfig,
}

impl ReportGenerator {
    pub fn new(llm: Arc<dyn ChatModel>, config: GeneratorConfig) -> Self {
        Self { llm, config }
    }

    pub fn has_credential(&self) -> bool {
        self.config.credential.is_some()
    }

    pub fn word_limit(&self) -> usize {
        self.config.word_limit
    }

    /// Whether `enforce_limit` would call the model for this report.
    pub fn needs_compression(&self, report: &str) -> bool {
        self.has_credential()
            && self.config.max_compression_attempts > 0
            && word_count(report) > self.config.word_limit
    }

    async fn ask(
        &self,
        api_key: &str,
        prompt: String,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, ReportError> {
        let messages = [ChatMessage::user(prompt)];
        bounded(
            cancel,
            self.config.request_timeout,
            self.llm.complete(api_key, &self.config.model, &messages),
            |limit| LlmError::Timeout(limit).into(),
        )
        .await
    }

    /// Drafts the report in a single call. Fails before calling the model
    /// when no credential is configured.
    pub async fn draft(
        &self,
        topic: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<Generation, ReportError> {
        let api_key = self
            .config
            .credential
            .as_deref()
            .ok_or(ReportError::Configuration {
                var: CREDENTIAL_VAR,
            })?;

        let prompt = report_prompt(self.config.word_limit, topic, context);
        let response = self.ask(api_key, prompt, cancel).await?;

        let mut generation = Generation {
            text: response.text.trim().to_string(),
            ..Default::default()
        };
        generation.absorb(&response);
        info!(words = word_count(&generation.text), "Report drafted");
        Ok(generation)
    }

    /// Compresses an over-long report. Without a credential the report is
    /// returned as-is, so the word limit is best-effort.
    ///
    /// Runs at most `max_compression_attempts` passes; the word count is
    /// only re-checked between passes, never after the last one.
    pub async fn compress(
        &self,
        topic: &str,
        report: &str,
        cancel: &CancellationToken,
    ) -> Result<Generation, ReportError> {
        let mut generation = Generation {
            text: report.to_string(),
            ..Default::default()
        };

        let Some(api_key) = self.config.credential.as_deref() else {
            warn!("No credential available, returning report uncompressed");
            return Ok(generation);
        };

        while generation.compression_passes < self.config.max_compression_attempts
            && word_count(&generation.text) > self.config.word_limit
        {
            let before = word_count(&generation.text);
            let prompt = compress_prompt(self.config.word_limit, topic, &generation.text);
            let response = self.ask(api_key, prompt, cancel).await?;

            generation.absorb(&response);
            generation.text = response.text.trim().to_string();
            generation.compression_passes += 1;
            info!(
                pass = generation.compression_passes,
                before,
                after = word_count(&generation.text),
                "Report compressed"
            );
        }

        Ok(generation)
    }

    pub async fn generate_report(
        &self,
        topic: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ReportError> {
        Ok(self.draft(topic, context, cancel).await?.text)
    }

    pub async fn enforce_limit(
        &self,
        topic: &str,
        report: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ReportError> {
        Ok(self.compress(topic, report, cancel).await?.text)
    }

    /// Draft followed by compression when needed.
    pub async fn generate(
        &self,
        topic: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<Report, ReportError> {
        let draft = self.draft(topic, context, cancel).await?;
        let compressed = self.compress(topic, &draft.text, cancel).await?;

        Ok(Report {
            word_count: word_count(&compressed.text),
            compression_passes: compressed.compression_passes,
            input_tokens: draft.input_tokens + compressed.input_tokens,
            output_tokens: draft.output_tokens + compressed.output_tokens,
            text: compressed.text,
        })
    }
}
