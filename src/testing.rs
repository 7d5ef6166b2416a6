//! Scripted collaborators shared by unit tests

use crate::error::AssistantError;
use crate::finder::TickerFinder;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::models::{CompanyRecord, FinderOutcome};
use crate::quotes::{QuoteService, RawQuote};
use crate::search::{SearchRequest, SearchResult, SearchService};
use crate::store::CompanyStore;
use crate::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replies with queued answers in order; records every request it saw
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|s| Ok(s.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AssistantError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(vec![Err(error)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::Llm("script exhausted".into())))
    }
}

/// Returns the same results for every query
pub struct StaticSearch {
    outcome: Mutex<Option<AssistantError>>,
    results: Vec<SearchResult>,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl StaticSearch {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            outcome: Mutex::new(None),
            results,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AssistantError) -> Self {
        Self {
            outcome: Mutex::new(Some(error)),
            results: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn hit(title: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!("https://news.example.com/{}", title.to_lowercase().replace(' ', "-")),
        snippet: snippet.to_string(),
    }
}

#[async_trait]
impl SearchService for StaticSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(error) = self.outcome.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.results.clone())
    }
}

/// Quote provider backed by a fixed map; unknown tickers are unrecognized
pub struct StaticQuotes {
    quotes: HashMap<String, RawQuote>,
    pub calls: AtomicUsize,
}

impl StaticQuotes {
    pub fn new(quotes: Vec<(&str, RawQuote)>) -> Self {
        Self {
            quotes: quotes.into_iter().map(|(t, q)| (t.to_string(), q)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuoteService for StaticQuotes {
    async fn quote(&self, ticker: &str) -> Result<Option<RawQuote>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.quotes.get(ticker).cloned())
    }
}

/// Finder that always answers the same way and counts invocations
pub struct ScriptedFinder {
    outcome: std::result::Result<FinderOutcome, String>,
    calls: AtomicUsize,
}

impl ScriptedFinder {
    pub fn found(ticker: &str, official_name: &str) -> Self {
        Self {
            outcome: Ok(FinderOutcome::Found {
                ticker: ticker.to_string(),
                official_name: official_name.to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            outcome: Ok(FinderOutcome::NotFound),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TickerFinder for ScriptedFinder {
    async fn find(&self, _company_name: &str) -> Result<FinderOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map_err(AssistantError::MalformedResponse)
    }
}

/// Store whose every operation fails, as if the file were unreachable
pub struct UnreachableStore;

#[async_trait]
impl CompanyStore for UnreachableStore {
    async fn find_by_name(&self, _name: &str) -> Result<Option<CompanyRecord>> {
        Err(AssistantError::Store("unable to open database file".into()))
    }

    async fn upsert(&self, _record: &CompanyRecord) -> Result<()> {
        Err(AssistantError::Store("unable to open database file".into()))
    }

    async fn all(&self) -> Result<Vec<CompanyRecord>> {
        Err(AssistantError::Store("unable to open database file".into()))
    }
}
