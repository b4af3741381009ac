use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ReportError;

/// Where a single query is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Retrieving,
    NoResults,
    RetrievalFailed,
    ReportDisabled,
    ContextBuilt,
    Generating,
    Generated,
    GenerationFailed,
    Compressing,
    Done,
    Cancelled,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::NoResults
                | Stage::RetrievalFailed
                | Stage::ReportDisabled
                | Stage::GenerationFailed
                | Stage::Done
                | Stage::Cancelled
        )
    }

    pub fn can_transition_to(self, next: Stage) -> bool {
        use Stage::*;
        if next == Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, Retrieving)
                | (Retrieving, NoResults | RetrievalFailed | ReportDisabled | ContextBuilt)
                | (ContextBuilt, Generating)
                | (Generating, Generated | GenerationFailed)
                | (Generated, Compressing | Done)
                | (Compressing, Done | GenerationFailed)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Retrieving => "retrieving",
            Stage::NoResults => "no_results",
            Stage::RetrievalFailed => "retrieval_failed",
            Stage::ReportDisabled => "report_disabled",
            Stage::ContextBuilt => "context_built",
            Stage::Generating => "generating",
            Stage::Generated => "generated",
            Stage::GenerationFailed => "generation_failed",
            Stage::Compressing => "compressing",
            Stage::Done => "done",
            Stage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Forward-only record of the stages one query has passed through.
#[derive(Debug, Clone)]
pub struct StageTracker {
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            history: vec![Stage::Idle],
        }
    }

    pub fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Idle)
    }

    pub fn advance(&mut self, next: Stage) -> Result<(), ReportError> {
        let from = self.current();
        if !from.can_transition_to(next) {
            return Err(ReportError::InvalidTransition { from, to: next });
        }
        tracing::debug!(%from, to = %next, "Stage transition");
        self.history.push(next);
        Ok(())
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
