//! Scripted collaborators shared by the pipeline tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{LlmError, RetrievalError};
use crate::llm::{ChatMessage, ChatModel, LlmResponse};
use crate::retrieval::{DocumentRetriever, RetrievedDocument};

/// `n` distinct words separated by spaces.
pub fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

/// Returns queued responses in order and records every request.
/// Panics when called more often than responses were queued.
pub struct ScriptedChatModel {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedChatModel {
    pub fn new(responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| {
                    Ok(LlmResponse {
                        text: t.to_string(),
                        input_tokens: 10,
                        output_tokens: 5,
                    })
                })
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Content of the last message of each request.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, messages)| messages.last().map(|m| m.content.clone()))
            .collect()
    }

    pub fn api_keys(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(
        &self,
        api_key: &str,
        _model: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmResponse, LlmError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push((api_key.to_string(), messages.to_vec()));
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!(
                "ScriptedChatModel: no more responses (call #{})",
                requests.len()
            )
        })
    }
}

/// Never answers.
pub struct StalledChatModel;

#[async_trait]
impl ChatModel for StalledChatModel {
    async fn complete(
        &self,
        _api_key: &str,
        _model: &str,
        _messages: &[ChatMessage],
    ) -> Result<LlmResponse, LlmError> {
        std::future::pending().await
    }
}

pub struct StaticRetriever {
    docs: Vec<RetrievedDocument>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(docs: Vec<RetrievedDocument>) -> Self {
        Self {
            docs,
            calls: AtomicUsize::new(0),
        }
    }

    /// `n` non-empty pages with Wikipedia-style URLs.
    pub fn pages(n: usize) -> Self {
        Self::new(
            (1..=n)
                .map(|i| {
                    RetrievedDocument::new(
                        format!("Page {i} describes the industry."),
                        Some(format!("https://en.wikipedia.org/wiki/Page_{i}")),
                    )
                })
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRetriever for StaticRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.iter().take(top_k).cloned().collect())
    }
}

pub struct FailingRetriever;

#[async_trait]
impl DocumentRetriever for FailingRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        Err(RetrievalError::Api {
            status: 503,
            body: "maintenance".into(),
        })
    }
}
