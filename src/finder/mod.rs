//! Search-backed ticker finder
//!
//! Used only when the local store misses. One general web search, then one
//! completion that extracts `{"ticker", "official_name"}` from the snippets.
//! A reply that cannot be read is an error, not a "not found".

use crate::error::AssistantError;
use crate::llm::{json_payload, CompletionRequest, TextCompletion};
use crate::models::{FinderOutcome, TICKER_NOT_FOUND};
use crate::search::{format_snippets, SearchRequest, SearchService, SearchTopic};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

const FINDER_MAX_RESULTS: u32 = 5;

const TICKER_RESEARCH_PROMPT: &str = r#"You are a financial research assistant.
Using ONLY the search results provided, identify the stock ticker symbol and the
official registered name of the company the user asked about.

Respond with a single JSON object and nothing else:
{"ticker": "FOUND_TICKER", "official_name": "FOUND_NAME"}

If the search results do not identify a publicly traded company, respond with:
{"ticker": null, "official_name": null}"#;

#[async_trait]
pub trait TickerFinder: Send + Sync {
    async fn find(&self, company_name: &str) -> Result<FinderOutcome>;
}

pub struct SearchBackedFinder {
    search: Arc<dyn SearchService>,
    llm: Arc<dyn TextCompletion>,
}

impl SearchBackedFinder {
    pub fn new(search: Arc<dyn SearchService>, llm: Arc<dyn TextCompletion>) -> Self {
        Self { search, llm }
    }
}

#[async_trait]
impl TickerFinder for SearchBackedFinder {
    async fn find(&self, company_name: &str) -> Result<FinderOutcome> {
        let request = SearchRequest::new(
            format!("{} stock ticker symbol official company name", company_name),
            FINDER_MAX_RESULTS,
            SearchTopic::General,
        );

        let results = self.search.search(&request).await?;
        if results.is_empty() {
            info!(company = %company_name, "Search returned nothing; treating as not found");
            return Ok(FinderOutcome::NotFound);
        }

        let prompt = CompletionRequest::new(
            TICKER_RESEARCH_PROMPT,
            format!(
                "Company: {}\n\nSearch results:\n{}",
                company_name,
                format_snippets(&results)
            ),
        );

        let reply = self.llm.complete(&prompt).await?;
        debug!(reply = %reply, "Finder extraction reply");

        parse_finder_reply(&reply, company_name)
    }
}

/// Read the extraction reply. A missing official name falls back to the
/// name the user asked about.
pub(crate) fn parse_finder_reply(reply: &str, company_name: &str) -> Result<FinderOutcome> {
    let json: serde_json::Value = serde_json::from_str(json_payload(reply)).map_err(|e| {
        warn!("Unreadable finder reply: {}", e);
        AssistantError::MalformedResponse(format!("{} | raw={}", e, reply))
    })?;

    let object = json.as_object().ok_or_else(|| {
        AssistantError::MalformedResponse(format!("Expected a JSON object | raw={}", reply))
    })?;

    let ticker = match object.get("ticker") {
        None => {
            return Err(AssistantError::MalformedResponse(format!(
                "Missing ticker field | raw={}",
                reply
            )))
        }
        Some(serde_json::Value::Null) => return Ok(FinderOutcome::NotFound),
        Some(serde_json::Value::String(s)) => s.trim().to_uppercase(),
        Some(other) => {
            return Err(AssistantError::MalformedResponse(format!(
                "ticker is not a string: {}",
                other
            )))
        }
    };

    if ticker.is_empty() || ticker == "NULL" || ticker == "NONE" || ticker == TICKER_NOT_FOUND {
        return Ok(FinderOutcome::NotFound);
    }

    if !is_plausible_ticker(&ticker) {
        return Err(AssistantError::MalformedResponse(format!(
            "Implausible ticker '{}'",
            ticker
        )));
    }

    let official_name = object
        .get("official_name")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .unwrap_or(company_name)
        .to_string();

    Ok(FinderOutcome::Found {
        ticker,
        official_name,
    })
}

/// Exchange symbols are short and use letters, digits, dots and dashes
fn is_plausible_ticker(ticker: &str) -> bool {
    ticker.len() <= 12
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
}
