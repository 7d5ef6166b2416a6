//! Ticker resolver with self-correction
//!
//! Local store first. On a miss the finder searches the web, and a confirmed
//! ticker is written back so the next lookup for that name hits the store.
//! Every failure collapses into [`ResolutionResult::Error`], which callers
//! can tell apart from a genuine not-found.

use crate::error::AssistantError;
use crate::finder::TickerFinder;
use crate::models::{CompanyRecord, FinderOutcome, ResolutionResult};
use crate::store::CompanyStore;
use crate::Result;
use std::sync::Arc;
use tracing::{error, info};

pub struct TickerResolver {
    store: Arc<dyn CompanyStore>,
    finder: Arc<dyn TickerFinder>,
}

impl TickerResolver {
    pub fn new(store: Arc<dyn CompanyStore>, finder: Arc<dyn TickerFinder>) -> Self {
        Self { store, finder }
    }

    pub async fn resolve(&self, company_name: &str) -> ResolutionResult {
        match self.try_resolve(company_name).await {
            Ok(result) => result,
            Err(e) => {
                error!(company = %company_name, kind = ?e.kind(), "Ticker resolution failed: {}", e);
                ResolutionResult::Error(e.to_string())
            }
        }
    }

    async fn try_resolve(&self, company_name: &str) -> Result<ResolutionResult> {
        let name = company_name.trim();
        if name.is_empty() {
            return Err(AssistantError::InvalidInput("company name is empty".to_string()));
        }

        if let Some(record) = self.store.find_by_name(name).await? {
            info!(company = %name, ticker = %record.ticker, "Resolved from local store");
            return Ok(ResolutionResult::Resolved(record.ticker));
        }

        info!(company = %name, "Not in local store; starting self-correction search");

        match self.finder.find(name).await? {
            FinderOutcome::Found {
                ticker,
                official_name,
            } => {
                let record = CompanyRecord::new(ticker.clone(), official_name, name);
                self.store.upsert(&record).await?;
                info!(company = %name, ticker = %ticker, "Learned new company");
                Ok(ResolutionResult::Resolved(ticker))
            }
            FinderOutcome::NotFound => {
                info!(company = %name, "No ticker found");
                Ok(ResolutionResult::NotFound)
            }
        }
    }
}
