use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::Stage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Report {
        text: String,
        word_count: usize,
        word_limit: usize,
        compression_passes: u32,
    },
    NoResults {
        message: String,
    },
    ReportDisabled {
        message: String,
    },
    Failed {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub id: String,
    pub timestamp: String,
    pub topic: String,
    pub sources: Vec<String>,
    pub context_chars: usize,
    pub stages: Vec<Stage>,
    pub retrieval_latency_ms: u64,
    pub generation_latency_ms: u64,
    pub compression_latency_ms: u64,
    pub total_latency_ms: u64,
    pub llm_input_tokens: u32,
    pub llm_output_tokens: u32,
    pub outcome: Outcome,
}

impl RunLog {
    pub fn new(topic: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            topic: topic.to_string(),
            sources: Vec::new(),
            context_chars: 0,
            stages: Vec::new(),
            retrieval_latency_ms: 0,
            generation_latency_ms: 0,
            compression_latency_ms: 0,
            total_latency_ms: 0,
            llm_input_tokens: 0,
            llm_output_tokens: 0,
            outcome: Outcome::Failed {
                kind: "Incomplete".into(),
                message: "run did not finish".into(),
            },
        }
    }

    pub fn final_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    pub fn total_tokens(&self) -> u32 {
        self.llm_input_tokens + self.llm_output_tokens
    }

    pub fn report(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Report { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        let words = match &self.outcome {
            Outcome::Report { word_count, .. } => word_count.to_string(),
            _ => "-".into(),
        };
        format!(
            "Stage: {} | Sources: {} | Words: {} | Total latency: {:.1}s | Tokens used by LLM: {}",
            self.final_stage(),
            self.sources.len(),
            words,
            self.total_latency_ms as f64 / 1000.0,
            self.total_tokens(),
        )
    }
}

pub struct RunLogger {
    dir: PathBuf,
}

impl RunLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create logs directory")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("runs.jsonl")
    }

    pub fn write(&self, run_log: &RunLog) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())
            .context("Failed to open log file")?;

        let json = serde_json::to_string(run_log).context("Failed to serialize run log")?;
        writeln!(file, "{}", json).context("Failed to write log")?;

        Ok(())
    }
}
