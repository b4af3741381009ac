pub mod wikipedia;

use async_trait::async_trait;

use crate::error::RetrievalError;

pub use wikipedia::WikipediaRetriever;

/// One retrieved page. Position in the returned sequence is its rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedDocument {
    pub text: String,
    pub source_label: Option<String>,
    pub title: Option<String>,
}

impl RetrievedDocument {
    pub fn new(text: impl Into<String>, source_label: Option<String>) -> Self {
        Self {
            text: text.into(),
            source_label,
            title: None,
        }
    }
}

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError>;
}
