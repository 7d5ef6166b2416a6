//! Web search collaborator
//!
//! Query in, ordered snippets out. The production client speaks the Tavily
//! search API; the credential is checked only when a search is issued.

use crate::config::{HttpConfig, SearchConfig};
use crate::error::AssistantError;
use crate::retry::retry_with_backoff;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    General,
    News,
}

impl fmt::Display for SearchTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchTopic::General => write!(f, "general"),
            SearchTopic::News => write!(f, "news"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
    pub topic: SearchTopic,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: u32, topic: SearchTopic) -> Self {
        Self {
            query: query.into(),
            max_results,
            topic,
        }
    }
}

/// One search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(alias = "content", default)]
    pub snippet: String,
}

/// Render hits as numbered plain text for a prompt
pub fn format_snippets(results: &[SearchResult]) -> String {
    let mut text = String::new();
    for (i, r) in results.iter().enumerate() {
        text.push_str(&format!("[{}] {}\n{}\n{}\n\n", i + 1, r.title, r.url, r.snippet));
    }
    text
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;
}

pub struct TavilyClient {
    client: Client,
    config: SearchConfig,
    retry_attempts: usize,
}

impl TavilyClient {
    pub fn new(config: SearchConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(http.timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            retry_attempts: http.retry_attempts,
        })
    }

    fn build_body<'a>(&'a self, request: &'a SearchRequest) -> TavilyRequest<'a> {
        TavilyRequest {
            api_key: &self.config.api_key,
            query: &request.query,
            max_results: request.max_results,
            topic: request.topic,
            search_depth: &self.config.search_depth,
        }
    }
}

#[async_trait]
impl SearchService for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        if self.config.api_key.is_empty() {
            return Err(AssistantError::Configuration(
                "TAVILY_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/search", self.config.base_url);
        let body = self.build_body(request);

        info!(query = %request.query, topic = %request.topic, "Performing web search");

        let parsed: TavilyResponse = retry_with_backoff("search", self.retry_attempts, || async {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    error!("Search request failed: {}", e);
                    AssistantError::from(e)
                })?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(AssistantError::Api {
                    status_code: status.as_u16(),
                    message,
                });
            }

            response
                .json::<TavilyResponse>()
                .await
                .map_err(|e| AssistantError::Search(format!("Invalid search response: {}", e)))
        })
        .await
        .map_err(|e| match e {
            AssistantError::Api { status_code, message } => {
                AssistantError::Search(format!("status {}: {}", status_code, message))
            }
            AssistantError::HttpError(e) => AssistantError::Search(e.to_string()),
            other => other,
        })?;

        info!(results = parsed.results.len(), "Search completed");
        Ok(parsed.results)
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    topic: SearchTopic,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}
