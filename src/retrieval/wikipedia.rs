use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{DocumentRetriever, RetrievedDocument};
use crate::error::RetrievalError;

/// Page text is capped per document before it reaches the context builder.
pub const DOC_CONTENT_CHARS_MAX: usize = 4000;

/// The search endpoint rejects longer queries.
const MAX_QUERY_CHARS: usize = 300;

const USER_AGENT: &str = concat!(
    "industry-report/",
    env!("CARGO_PKG_VERSION"),
    " (market research report generator)"
);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    extract: Option<String>,
    fullurl: Option<String>,
}

/// Searches Wikipedia and fetches the plain-text content of each hit.
pub struct WikipediaRetriever {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaRetriever {
    pub fn new(lang: &str) -> Result<Self> {
        Self::with_api_url(&format!("https://{}.wikipedia.org/w/api.php", lang))
    }

    pub fn with_api_url(api_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build Wikipedia HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, RetrievalError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(RetrievalError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let query: String = query.chars().take(MAX_QUERY_CHARS).collect();
        let limit = top_k.to_string();
        let response: SearchResponse = self
            .get_json(&[
                ("list", "search"),
                ("srsearch", query.as_str()),
                ("srlimit", limit.as_str()),
                ("srprop", ""),
            ])
            .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn fetch_page(&self, title: &str) -> Result<Option<RetrievedDocument>, RetrievalError> {
        let response: PageResponse = self
            .get_json(&[
                ("prop", "extracts|info"),
                ("explaintext", "1"),
                ("inprop", "url"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        let page = response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|p| !p.missing);

        Ok(page.map(|p| RetrievedDocument {
            text: p
                .extract
                .unwrap_or_default()
                .chars()
                .take(DOC_CONTENT_CHARS_MAX)
                .collect(),
            source_label: p.fullurl,
            title: Some(p.title),
        }))
    }
}

#[async_trait]
impl DocumentRetriever for WikipediaRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let titles = self.search(query, top_k).await?;
        debug!(query, hits = titles.len(), "Wikipedia search complete");

        // Fetched one at a time so the result keeps the search ranking.
        let mut documents = Vec::with_capacity(titles.len());
        for title in titles.iter().take(top_k) {
            match self.fetch_page(title).await? {
                Some(doc) => documents.push(doc),
                None => debug!(title = %title, "Page vanished between search and fetch"),
            }
        }

        Ok(documents)
    }
}
