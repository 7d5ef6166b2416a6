//! Component wiring shared by the binaries

use crate::agent::Coordinator;
use crate::config::{key_fingerprint, AppConfig};
use crate::execution::ExecutionEngine;
use crate::finder::SearchBackedFinder;
use crate::llm::{OpenAiClient, TextCompletion};
use crate::memory::{InMemoryPreferenceMemory, PreferenceMemory};
use crate::metrics::MetricsFetcher;
use crate::news::NewsSummarizer;
use crate::planner::LlmPlanner;
use crate::quotes::YahooQuoteClient;
use crate::resolver::TickerResolver;
use crate::search::{SearchService, TavilyClient};
use crate::store::SqliteCompanyStore;
use crate::tools::create_default_registry;
use crate::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub struct App {
    pub store: Arc<SqliteCompanyStore>,
    pub resolver: Arc<TickerResolver>,
    pub coordinator: Arc<Coordinator>,
}

impl App {
    /// Build every component. Missing credentials are not checked here; each
    /// service reports them when first used.
    pub fn build(config: &AppConfig) -> Result<Self> {
        let llm: Arc<dyn TextCompletion> =
            Arc::new(OpenAiClient::new(config.llm.clone(), &config.http)?);
        let search: Arc<dyn SearchService> =
            Arc::new(TavilyClient::new(config.search.clone(), &config.http)?);
        let quotes = Arc::new(YahooQuoteClient::new(config.quote.clone(), &config.http)?);

        let store = Arc::new(SqliteCompanyStore::new(&config.db_file));
        let finder = Arc::new(SearchBackedFinder::new(search.clone(), llm.clone()));
        let resolver = Arc::new(TickerResolver::new(store.clone(), finder));
        let fetcher = Arc::new(MetricsFetcher::new(quotes));
        let summarizer = Arc::new(NewsSummarizer::new(search, llm.clone()));
        let memory: Arc<dyn PreferenceMemory> = Arc::new(InMemoryPreferenceMemory::new());

        let registry = create_default_registry(resolver.clone(), fetcher, summarizer, memory.clone());
        let planner = LlmPlanner::new(llm.clone(), registry.descriptions());
        let coordinator = Coordinator::new(
            Box::new(planner),
            ExecutionEngine::new(registry),
            memory,
            llm,
        );

        info!(
            model = %config.llm.model,
            llm_key = %key_fingerprint(&config.llm.api_key),
            search_key = %key_fingerprint(&config.search.api_key),
            db = %config.db_file.display(),
            "Components initialized"
        );

        Ok(Self {
            store,
            resolver,
            coordinator: Arc::new(coordinator),
        })
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
/// With `to_stderr`, stdout is left to the answer text.
pub fn init_tracing(default_filter: &str, to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if to_stderr {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
