pub mod config;
pub mod error;
pub mod instrumentation;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
