//! Tool trait and registry
//!
//! Each specialist is exposed to the coordinator as a tool that takes a JSON
//! object and returns a JSON value. Inputs come from model output and are
//! validated here; the session id is never read from parameters.

use crate::error::AssistantError;
use crate::memory::PreferenceMemory;
use crate::metrics::MetricsFetcher;
use crate::models::{ResolutionResult, ToolInput, ToolOutput, TICKER_NOT_FOUND, TICKER_NOT_FOUND_ERROR};
use crate::news::NewsSummarizer;
use crate::resolver::TickerResolver;
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const RESOLVE_TICKER: &str = "resolve_ticker";
pub const FINANCIAL_METRICS: &str = "financial_metrics";
pub const NEWS_RESEARCH: &str = "news_research";
pub const PREFERENCE_MEMORY: &str = "preference_memory";

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// `name: description` lines for prompts, sorted by name
    pub fn descriptions(&self) -> Vec<String> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(AssistantError::InvalidInput(
            "tool_input must be a JSON object".to_string(),
        ))
    }
}

fn require_str<'a>(input: &'a ToolInput, key: &str) -> Result<&'a str> {
    input
        .parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AssistantError::InvalidInput(format!(
                "Expected non-empty '{}' in tool_input for {}",
                key, input.tool_name
            ))
        })
}

/// A ticker argument; resolver sentinels are rejected before any network call
fn require_ticker(input: &ToolInput) -> Result<String> {
    let ticker = require_str(input, "ticker")?.to_uppercase();
    if ticker == TICKER_NOT_FOUND || ticker == TICKER_NOT_FOUND_ERROR {
        return Err(AssistantError::InvalidTicker(ticker));
    }
    Ok(ticker)
}

pub struct ResolveTickerTool {
    resolver: Arc<TickerResolver>,
}

impl ResolveTickerTool {
    pub fn new(resolver: Arc<TickerResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait::async_trait]
impl Tool for ResolveTickerTool {
    fn name(&self) -> &'static str {
        RESOLVE_TICKER
    }

    fn description(&self) -> &'static str {
        "Convert a company name to its stock ticker. Call FIRST for every company. \
         Input {\"company_name\": \"Apple\"}. Returns the ticker, TICKER_NOT_FOUND, \
         or TICKER_NOT_FOUND_ERROR when resolution failed."
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let company_name = require_str(input, "company_name")?;

        let result = self.resolver.resolve(company_name).await;
        let data = json!({
            "company_name": company_name,
            "ticker": result.as_sentinel(),
        });

        Ok(match result {
            ResolutionResult::Error(cause) => ToolOutput {
                success: false,
                data,
                error: Some(cause),
            },
            _ => ToolOutput::ok(data),
        })
    }
}

pub struct FinancialMetricsTool {
    fetcher: Arc<MetricsFetcher>,
}

impl FinancialMetricsTool {
    pub fn new(fetcher: Arc<MetricsFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl Tool for FinancialMetricsTool {
    fn name(&self) -> &'static str {
        FINANCIAL_METRICS
    }

    fn description(&self) -> &'static str {
        "Live price, trailing P/E, sector and market cap for a resolved ticker. \
         Input {\"ticker\": \"AAPL\"}."
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let ticker = require_ticker(input)?;

        let snapshot = self.fetcher.fetch(&ticker).await?;
        Ok(ToolOutput::ok(serde_json::to_value(&snapshot)?))
    }
}

pub struct NewsResearchTool {
    summarizer: Arc<NewsSummarizer>,
}

impl NewsResearchTool {
    pub fn new(summarizer: Arc<NewsSummarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait::async_trait]
impl Tool for NewsResearchTool {
    fn name(&self) -> &'static str {
        NEWS_RESEARCH
    }

    fn description(&self) -> &'static str {
        "Short summary of the latest news and market sentiment for a resolved ticker. \
         Input {\"ticker\": \"TSLA\"}."
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let ticker = require_ticker(input)?;

        let summary = self.summarizer.summarize(&ticker).await?;
        Ok(ToolOutput::ok(json!({
            "ticker": ticker,
            "summary": summary,
        })))
    }
}

pub struct PreferenceMemoryTool {
    memory: Arc<dyn PreferenceMemory>,
}

impl PreferenceMemoryTool {
    pub fn new(memory: Arc<dyn PreferenceMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait::async_trait]
impl Tool for PreferenceMemoryTool {
    fn name(&self) -> &'static str {
        PREFERENCE_MEMORY
    }

    fn description(&self) -> &'static str {
        "Remember or recall the user's stated preferences. \
         Input {\"action\": \"store\", \"content\": \"Prefers P/E analysis\"} or {\"action\": \"list\"}."
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let action = require_str(input, "action")?.to_lowercase();

        match action.as_str() {
            "store" => {
                let content = require_str(input, "content")?;
                let preference = self.memory.store(input.session_id, content).await?;
                Ok(ToolOutput::ok(json!({
                    "stored": preference.content,
                    "id": preference.id,
                })))
            }
            "list" | "retrieve" => {
                let preferences: Vec<Value> = self
                    .memory
                    .list(input.session_id)
                    .await?
                    .into_iter()
                    .map(|p| Value::String(p.content))
                    .collect();
                Ok(ToolOutput::ok(json!({ "preferences": preferences })))
            }
            other => Err(AssistantError::InvalidInput(format!(
                "Unknown preference_memory action '{}'; expected store or list",
                other
            ))),
        }
    }
}

/// Registry with the four specialist tools
pub fn create_default_registry(
    resolver: Arc<TickerResolver>,
    fetcher: Arc<MetricsFetcher>,
    summarizer: Arc<NewsSummarizer>,
    memory: Arc<dyn PreferenceMemory>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(ResolveTickerTool::new(resolver)));
    registry.register(Arc::new(FinancialMetricsTool::new(fetcher)));
    registry.register(Arc::new(NewsResearchTool::new(summarizer)));
    registry.register(Arc::new(PreferenceMemoryTool::new(memory)));

    registry
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory::InMemoryPreferenceMemory;
    use crate::models::seed_records;
    use crate::quotes::RawQuote;
    use crate::store::InMemoryCompanyStore;
    use crate::testing::{hit, ScriptedCompletion, ScriptedFinder, StaticQuotes, StaticSearch};
    use uuid::Uuid;

    /// Registry over seeded store, fixed quotes for AAPL and GOOGL, and one news hit
    pub(crate) fn fixture_registry(memory: Arc<dyn PreferenceMemory>) -> ToolRegistry {
        let resolver = Arc::new(TickerResolver::new(
            Arc::new(InMemoryCompanyStore::with_records(seed_records())),
            Arc::new(ScriptedFinder::not_found()),
        ));
        let fetcher = Arc::new(MetricsFetcher::new(Arc::new(StaticQuotes::new(vec![
            (
                "AAPL",
                RawQuote {
                    price: Some(189.84),
                    trailing_pe: Some(29.4),
                    sector: Some("Technology".into()),
                    market_cap: Some(2_950_000_000_000),
                },
            ),
            (
                "GOOGL",
                RawQuote {
                    price: Some(141.2),
                    trailing_pe: None,
                    sector: Some("Communication Services".into()),
                    market_cap: Some(1_760_000_000_000),
                },
            ),
        ]))));
        let summarizer = Arc::new(NewsSummarizer::new(
            Arc::new(StaticSearch::with_results(vec![hit("Apple unveils", "New products")])),
            Arc::new(ScriptedCompletion::new(["Apple unveiled new products. Sentiment is positive."])),
        ));

        create_default_registry(resolver, fetcher, summarizer, memory)
    }

    fn input(tool: &str, parameters: Value, session_id: Uuid) -> ToolInput {
        ToolInput {
            tool_name: tool.to_string(),
            parameters,
            session_id,
        }
    }

    #[test]
    fn test_registry_lists_tools_sorted() {
        let registry = fixture_registry(Arc::new(InMemoryPreferenceMemory::new()));
        assert_eq!(
            registry.list(),
            vec![FINANCIAL_METRICS, NEWS_RESEARCH, PREFERENCE_MEMORY, RESOLVE_TICKER]
        );
        assert!(registry.descriptions()[0].starts_with("financial_metrics: "));
        assert!(registry.get("backtester").is_none());
    }

    #[tokio::test]
    async fn test_resolve_tool_returns_sentinels() {
        let registry = fixture_registry(Arc::new(InMemoryPreferenceMemory::new()));
        let tool = registry.get(RESOLVE_TICKER).unwrap();
        let session = Uuid::new_v4();

        let found = tool
            .execute(&input(RESOLVE_TICKER, json!({"company_name": "Search Giant"}), session))
            .await
            .unwrap();
        assert!(found.success);
        assert_eq!(found.data["ticker"], "GOOGL");

        let miss = tool
            .execute(&input(RESOLVE_TICKER, json!({"company_name": "Nonexistent Co"}), session))
            .await
            .unwrap();
        assert!(miss.success);
        assert_eq!(miss.data["ticker"], TICKER_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_tool_rejects_sentinel_and_bad_input() {
        let registry = fixture_registry(Arc::new(InMemoryPreferenceMemory::new()));
        let tool = registry.get(FINANCIAL_METRICS).unwrap();
        let session = Uuid::new_v4();

        assert!(matches!(
            tool.execute(&input(FINANCIAL_METRICS, json!({"ticker": TICKER_NOT_FOUND}), session)).await,
            Err(AssistantError::InvalidTicker(_))
        ));
        assert!(matches!(
            tool.execute(&input(FINANCIAL_METRICS, json!("AAPL"), session)).await,
            Err(AssistantError::InvalidInput(_))
        ));

        let output = tool
            .execute(&input(FINANCIAL_METRICS, json!({"ticker": "googl"}), session))
            .await
            .unwrap();
        assert_eq!(output.data["ticker"], "GOOGL");
        assert_eq!(output.data["trailingPE"], "N/A");
    }

    #[tokio::test]
    async fn test_preference_tool_uses_injected_session() {
        let memory = Arc::new(InMemoryPreferenceMemory::new());
        let registry = fixture_registry(memory.clone());
        let tool = registry.get(PREFERENCE_MEMORY).unwrap();
        let session = Uuid::new_v4();
        let other = Uuid::new_v4();

        tool.execute(&input(
            PREFERENCE_MEMORY,
            json!({"action": "store", "content": "Prefers P/E analysis", "session_id": other.to_string()}),
            session,
        ))
        .await
        .unwrap();

        assert_eq!(memory.list(session).await.unwrap().len(), 1);
        assert!(memory.list(other).await.unwrap().is_empty());

        let listed = tool
            .execute(&input(PREFERENCE_MEMORY, json!({"action": "list"}), session))
            .await
            .unwrap();
        assert_eq!(listed.data["preferences"], json!(["Prefers P/E analysis"]));

        assert!(tool
            .execute(&input(PREFERENCE_MEMORY, json!({"action": "forget"}), session))
            .await
            .is_err());
    }
}
