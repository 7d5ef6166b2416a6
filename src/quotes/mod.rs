//! Market-data collaborator
//!
//! Ticker in, raw quote fields out. `Ok(None)` means the provider does not
//! recognize the symbol; transport failures are errors.
//!
//! quoteSummary rejects requests without a session cookie and a matching
//! `crumb` parameter. The client keeps both for its lifetime and fetches a
//! fresh crumb once when the provider answers 401.

use crate::config::{HttpConfig, QuoteConfig};
use crate::error::AssistantError;
use crate::retry::retry_with_backoff;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Provider fields before sentinel mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuote {
    pub price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub sector: Option<String>,
    pub market_cap: Option<u64>,
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Option<RawQuote>>;
}

/// Yahoo Finance quoteSummary client
pub struct YahooQuoteClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    retry_attempts: usize,
    crumb: RwLock<Option<String>>,
}

const QUOTE_MODULES: &str = "price,summaryDetail,assetProfile";

impl YahooQuoteClient {
    pub fn new(config: QuoteConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(http.timeout)
            .user_agent("Mozilla/5.0 (financial-analyst-agents)")
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            cookie_url: config.cookie_url,
            retry_attempts: http.retry_attempts,
            crumb: RwLock::new(None),
        })
    }

    fn url_for(&self, ticker: &str) -> String {
        format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker)
    }

    /// Cached crumb, or a new one when `refresh` is set or none is held yet
    async fn crumb(&self, refresh: bool) -> Result<String> {
        if !refresh {
            if let Some(crumb) = self.crumb.read().await.as_ref() {
                return Ok(crumb.clone());
            }
        }

        let mut slot = self.crumb.write().await;
        if !refresh {
            if let Some(crumb) = slot.as_ref() {
                return Ok(crumb.clone());
            }
        }

        // The cookie response status is irrelevant; only the Set-Cookie matters.
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            warn!("Quote cookie request failed: {}", e);
        }

        let crumb = retry_with_backoff("quote-crumb", self.retry_attempts, || async {
            let response = self
                .client
                .get(format!("{}/v1/test/getcrumb", self.base_url))
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(AssistantError::Api {
                    status_code: status.as_u16(),
                    message: body,
                });
            }
            Ok(body.trim().to_string())
        })
        .await?;

        if crumb.is_empty() || crumb.contains('<') {
            return Err(AssistantError::Quote("Provider returned no crumb".to_string()));
        }

        info!("Quote session crumb acquired");
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_summary(&self, url: &str, crumb: &str) -> Result<Option<QuoteSummaryEnvelope>> {
        retry_with_backoff("quote", self.retry_attempts, || async {
            let response = self
                .client
                .get(url)
                .query(&[("modules", QUOTE_MODULES), ("crumb", crumb)])
                .send()
                .await
                .map_err(|e| {
                    error!("Quote request failed: {}", e);
                    AssistantError::from(e)
                })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(AssistantError::Api {
                    status_code: status.as_u16(),
                    message,
                });
            }

            response
                .json::<QuoteSummaryEnvelope>()
                .await
                .map(Some)
                .map_err(|e| AssistantError::Quote(format!("Invalid quote response: {}", e)))
        })
        .await
    }

    async fn fetch_with_session(&self, ticker: &str) -> Result<Option<QuoteSummaryEnvelope>> {
        let url = self.url_for(ticker);
        let crumb = self.crumb(false).await?;

        match self.fetch_summary(&url, &crumb).await {
            Err(AssistantError::Api { status_code: 401, .. }) => {
                warn!(ticker, "Quote crumb rejected, refreshing session");
                let crumb = self.crumb(true).await?;
                self.fetch_summary(&url, &crumb).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl QuoteService for YahooQuoteClient {
    async fn quote(&self, ticker: &str) -> Result<Option<RawQuote>> {
        debug!(ticker, "Fetching quote summary");

        let envelope = self
            .fetch_with_session(ticker)
            .await
            .map_err(|e| match e {
                AssistantError::Api { status_code, message } => {
                    AssistantError::Quote(format!("status {}: {}", status_code, message))
                }
                AssistantError::HttpError(e) => AssistantError::Quote(e.to_string()),
                other => other,
            })?;

        Ok(envelope.and_then(QuoteSummaryEnvelope::into_raw_quote))
    }
}

//
// ================= Wire types =================
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryEnvelope {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetailModule>,
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    regular_market_price: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct AssetProfileModule {
    sector: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; empty objects mean absent
#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

impl QuoteSummaryEnvelope {
    fn into_raw_quote(self) -> Option<RawQuote> {
        let result = self.quote_summary.result?.into_iter().next()?;

        let price = result.price.as_ref();

        Some(RawQuote {
            price: price
                .and_then(|p| p.regular_market_price.as_ref())
                .and_then(|v| v.raw),
            trailing_pe: result
                .summary_detail
                .and_then(|d| d.trailing_pe)
                .and_then(|v| v.raw),
            sector: result
                .asset_profile
                .and_then(|a| a.sector)
                .filter(|s| !s.trim().is_empty()),
            market_cap: price
                .and_then(|p| p.market_cap.as_ref())
                .and_then(|v| v.raw)
                .filter(|v| *v >= 0.0)
                .map(|v| v as u64),
        })
    }
}
