//! News research specialist
//!
//! One news-topic search per ticker, condensed by the model into a short
//! summary of recent headlines and sentiment.

use crate::error::AssistantError;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::search::{format_snippets, SearchRequest, SearchService, SearchTopic};
use crate::Result;
use std::sync::Arc;
use tracing::info;

const NEWS_MAX_RESULTS: u32 = 3;

const NEWS_ANALYST_PROMPT: &str = "You are a market news analyst. Using only the search \
results provided, write a concise summary of 3-4 sentences covering the latest news \
and the overall market sentiment for the given stock ticker. Do not invent facts that \
are not in the results.";

pub struct NewsSummarizer {
    search: Arc<dyn SearchService>,
    llm: Arc<dyn TextCompletion>,
}

impl NewsSummarizer {
    pub fn new(search: Arc<dyn SearchService>, llm: Arc<dyn TextCompletion>) -> Self {
        Self { search, llm }
    }

    pub async fn summarize(&self, ticker: &str) -> Result<String> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(AssistantError::InvalidInput("ticker is empty".to_string()));
        }

        let request = SearchRequest::new(
            format!("Latest news and market sentiment for {}", ticker),
            NEWS_MAX_RESULTS,
            SearchTopic::News,
        );

        let results = self.search.search(&request).await?;
        if results.is_empty() {
            return Err(AssistantError::NoResults(ticker));
        }

        let prompt = CompletionRequest::new(
            NEWS_ANALYST_PROMPT,
            format!(
                "Ticker: {}\n\nSearch results:\n{}",
                ticker,
                format_snippets(&results)
            ),
        );

        let summary = self.llm.complete(&prompt).await?;
        info!(ticker = %ticker, sources = results.len(), "News summarized");
        Ok(summary.trim().to_string())
    }
}
