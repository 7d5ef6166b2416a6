//! Financial metrics specialist
//!
//! One quote call per request. An unrecognized symbol is an error, never a
//! snapshot with invented numbers. Only a missing P/E is replaced by the
//! unavailable sentinel; other gaps pass through as provider nulls.

use crate::error::AssistantError;
use crate::models::{MetricValue, QuoteSnapshot, UNAVAILABLE};
use crate::quotes::QuoteService;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct MetricsFetcher {
    quotes: Arc<dyn QuoteService>,
}

impl MetricsFetcher {
    pub fn new(quotes: Arc<dyn QuoteService>) -> Self {
        Self { quotes }
    }

    pub async fn fetch(&self, ticker: &str) -> Result<QuoteSnapshot> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(AssistantError::InvalidTicker("<empty>".to_string()));
        }

        let raw = self.quotes.quote(&ticker).await?;

        let Some(raw) = raw.filter(|q| q.price.is_some()) else {
            warn!(ticker = %ticker, "No usable market price");
            return Err(AssistantError::InvalidTicker(ticker));
        };

        let snapshot = QuoteSnapshot {
            current_price: raw.price,
            pe_ratio: MetricValue::from_option(raw.trailing_pe),
            sector: raw.sector.unwrap_or_else(|| UNAVAILABLE.to_string()),
            market_cap: raw.market_cap,
            ticker,
        };

        info!(ticker = %snapshot.ticker, pe = %snapshot.pe_ratio, "Metrics fetched");
        Ok(snapshot)
    }
}
