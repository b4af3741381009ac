//! Error types for the report pipeline.
//!
//! Collaborator failures (`LlmError`, `RetrievalError`) are wrapped by
//! `ReportError`, which is what the pipeline and the CLI surface.

use std::time::Duration;
use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to send request to LLM API: {0}")]
    Network(#[source] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse LLM API response: {0}")]
    InvalidResponse(String),

    #[error("LLM API returned no content")]
    EmptyResponse,

    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Network(_) => "NetworkError",
            LlmError::Api { .. } => "ApiError",
            LlmError::InvalidResponse(_) => "InvalidResponse",
            LlmError::EmptyResponse => "EmptyResponse",
            LlmError::Timeout(_) => "Timeout",
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("failed to send request to Wikipedia: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Wikipedia API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse Wikipedia response: {0}")]
    InvalidResponse(String),

    #[error("Wikipedia request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("missing credential: {var} is not set. Set {var} to enable report generation.")]
    Configuration { var: &'static str },

    #[error("No relevant Wikipedia pages found for \"{topic}\". Try a different industry keyword.")]
    EmptyResult { topic: String },

    #[error("LLM call failed: {0}")]
    Generation(#[from] LlmError),

    #[error("document retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Please enter an industry to begin.")]
    EmptyTopic,

    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

impl ReportError {
    /// Category name shown to the user next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::Configuration { .. } => "ConfigurationError",
            ReportError::EmptyResult { .. } => "EmptyResultError",
            ReportError::Generation(_) => "GenerationError",
            ReportError::Retrieval(_) => "RetrievalError",
            ReportError::Cancelled => "Cancelled",
            ReportError::EmptyTopic => "EmptyTopic",
            ReportError::InvalidTransition { .. } => "InvalidTransition",
        }
    }
}
