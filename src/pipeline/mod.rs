pub mod context;
pub mod generator;
pub mod stage;
pub mod words;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, CREDENTIAL_VAR};
use crate::error::{ReportError, RetrievalError};
use crate::instrumentation::{Outcome, RunLog, RunLogger};
use crate::llm::{ChatModel, LlmClient};
use crate::retrieval::{DocumentRetriever, WikipediaRetriever};

pub use context::{build_context, MAX_SOURCES};
pub use generator::{GeneratorConfig, ReportGenerator};
pub use stage::{Stage, StageTracker};
pub use words::word_count;

const MISSING_SOURCE: &str = "URL not available";

/// Races `call` against the timeout and the cancellation token.
pub(crate) async fn bounded<T, E, F>(
    cancel: &CancellationToken,
    limit: Duration,
    call: F,
    on_timeout: impl FnOnce(Duration) -> ReportError,
) -> Result<T, ReportError>
where
    F: Future<Output = Result<T, E>>,
    ReportError: From<E>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReportError::Cancelled),
        result = tokio::time::timeout(limit, call) => match result {
            Ok(inner) => inner.map_err(ReportError::from),
            Err(_) => Err(on_timeout(limit)),
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Retrieval → context → report → compression for one topic at a time.
pub struct Pipeline {
    retriever: Arc<dyn DocumentRetriever>,
    generator: ReportGenerator,
    logger: RunLogger,
    top_k: usize,
    max_context_chars: usize,
    request_timeout: Duration,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        let retriever = Arc::new(WikipediaRetriever::new(&config.wikipedia_lang)?);
        let llm = Arc::new(LlmClient::new(&config.llm_base_url));
        let logger = RunLogger::new(&config.log_dir)?;
        Ok(Self::with_collaborators(retriever, llm, config, logger))
    }

    pub fn with_collaborators(
        retriever: Arc<dyn DocumentRetriever>,
        llm: Arc<dyn ChatModel>,
        config: &Config,
        logger: RunLogger,
    ) -> Self {
        Self {
            retriever,
            generator: ReportGenerator::new(llm, GeneratorConfig::from(config)),
            logger,
            top_k: config.top_k,
            max_context_chars: config.max_context_chars,
            request_timeout: config.request_timeout,
        }
    }

    /// Runs one query to a terminal stage and appends its run log.
    ///
    /// Collaborator failures end up in `RunLog::outcome`; only an empty
    /// topic or an illegal stage transition is returned as an error. A run
    /// log that cannot be written is only warned about.
    pub async fn run(&self, topic: &str, cancel: &CancellationToken) -> Result<RunLog> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ReportError::EmptyTopic.into());
        }

        let run_start = Instant::now();
        let mut stages = StageTracker::new();
        let mut run_log = RunLog::new(topic);

        let outcome = match self.drive(topic, cancel, &mut stages, &mut run_log).await {
            Ok(outcome) => outcome,
            Err(err @ ReportError::InvalidTransition { .. }) => return Err(err.into()),
            Err(err) => {
                let terminal = match &err {
                    ReportError::Cancelled => Stage::Cancelled,
                    ReportError::Retrieval(_) => Stage::RetrievalFailed,
                    _ => Stage::GenerationFailed,
                };
                stages.advance(terminal)?;
                warn!(kind = err.kind(), error = %err, "Pipeline halted");
                Outcome::Failed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }
            }
        };

        run_log.outcome = outcome;
        run_log.stages = stages.history().to_vec();
        run_log.total_latency_ms = elapsed_ms(run_start);

        if let Err(e) = self.logger.write(&run_log) {
            warn!(error = %e, "Failed to write run log");
        }

        Ok(run_log)
    }

    async fn drive(
        &self,
        topic: &str,
        cancel: &CancellationToken,
        stages: &mut StageTracker,
        run_log: &mut RunLog,
    ) -> Result<Outcome, ReportError> {
        stages.advance(Stage::Retrieving)?;
        info!(topic, "Searching Wikipedia");
        let retrieval_start = Instant::now();
        let docs = bounded(
            cancel,
            self.request_timeout,
            self.retriever.retrieve(topic, self.top_k),
            |limit| RetrievalError::Timeout(limit).into(),
        )
        .await?;
        run_log.retrieval_latency_ms = elapsed_ms(retrieval_start);

        if docs.is_empty() {
            stages.advance(Stage::NoResults)?;
            let err = ReportError::EmptyResult {
                topic: topic.to_string(),
            };
            warn!(kind = err.kind(), "No documents retrieved");
            return Ok(Outcome::NoResults {
                message: err.to_string(),
            });
        }

        run_log.sources = docs
            .iter()
            .take(MAX_SOURCES)
            .map(|d| {
                d.source_label
                    .clone()
                    .unwrap_or_else(|| MISSING_SOURCE.to_string())
            })
            .collect();
        info!(sources = run_log.sources.len(), "Documents retrieved");

        if !self.generator.has_credential() {
            stages.advance(Stage::ReportDisabled)?;
            let err = ReportError::Configuration {
                var: CREDENTIAL_VAR,
            };
            warn!(kind = err.kind(), "Report generation disabled");
            return Ok(Outcome::ReportDisabled {
                message: err.to_string(),
            });
        }

        let context = build_context(&docs, self.max_context_chars);
        run_log.context_chars = context.chars().count();
        stages.advance(Stage::ContextBuilt)?;

        stages.advance(Stage::Generating)?;
        let generation_start = Instant::now();
        let draft = self.generator.draft(topic, &context, cancel).await?;
        run_log.generation_latency_ms = elapsed_ms(generation_start);
        run_log.llm_input_tokens += draft.input_tokens;
        run_log.llm_output_tokens += draft.output_tokens;
        stages.advance(Stage::Generated)?;

        let mut report = draft.text;
        let mut compression_passes = 0;
        if self.generator.needs_compression(&report) {
            stages.advance(Stage::Compressing)?;
            info!(words = word_count(&report), "Report over limit, compressing");
            let compression_start = Instant::now();
            let compressed = self.generator.compress(topic, &report, cancel).await?;
            run_log.compression_latency_ms = elapsed_ms(compression_start);
            run_log.llm_input_tokens += compressed.input_tokens;
            run_log.llm_output_tokens += compressed.output_tokens;
            compression_passes = compressed.compression_passes;
            report = compressed.text;
        }
        stages.advance(Stage::Done)?;

        let words = word_count(&report);
        if words > self.generator.word_limit() {
            warn!(
                words,
                limit = self.generator.word_limit(),
                "Final report is still over the word limit"
            );
        }

        Ok(Outcome::Report {
            text: report,
            word_count: words,
            word_limit: self.generator.word_limit(),
            compression_passes,
        })
    }
}
