//! Core data models for the financial analyst agents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Sentinel returned to callers when a completed lookup found nothing
pub const TICKER_NOT_FOUND: &str = "TICKER_NOT_FOUND";

/// Sentinel returned to callers when the lookup itself failed
pub const TICKER_NOT_FOUND_ERROR: &str = "TICKER_NOT_FOUND_ERROR";

/// Placeholder for a field the provider could not supply
pub const UNAVAILABLE: &str = "N/A";

//
// ================= Company Metadata =================
//

/// One row of the `company_metadata` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyRecord {
    pub ticker: String,
    pub official_name: String,
    pub common_name: String,
}

impl CompanyRecord {
    pub fn new(
        ticker: impl Into<String>,
        official_name: impl Into<String>,
        common_name: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            official_name: official_name.into(),
            common_name: common_name.into(),
        }
    }
}

/// Starter companies written by the setup routine: (official_name, common_name, ticker)
pub const SEED_COMPANIES: &[(&str, &str, &str)] = &[
    ("Apple", "Big Fruit Corp", "AAPL"),
    ("Microsoft", "Redmond Tech", "MSFT"),
    ("Google", "Search Giant", "GOOGL"),
    ("Tesla", "Electric Car Co.", "TSLA"),
    ("Amazon", "Online Shopping Giant", "AMZN"),
];

pub fn seed_records() -> Vec<CompanyRecord> {
    SEED_COMPANIES
        .iter()
        .map(|(official, common, ticker)| CompanyRecord::new(*ticker, *official, *common))
        .collect()
}

//
// ================= Resolution =================
//

/// Outcome of resolving a company name to a ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Resolved(String),
    NotFound,
    /// The resolution process failed; carries the cause for logs
    Error(String),
}

impl ResolutionResult {
    /// The string handed to the coordinator: a ticker or one of the sentinels
    pub fn as_sentinel(&self) -> &str {
        match self {
            ResolutionResult::Resolved(ticker) => ticker,
            ResolutionResult::NotFound => TICKER_NOT_FOUND,
            ResolutionResult::Error(_) => TICKER_NOT_FOUND_ERROR,
        }
    }
}

impl fmt::Display for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sentinel())
    }
}

/// What the search-backed finder extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinderOutcome {
    Found {
        ticker: String,
        official_name: String,
    },
    NotFound,
}

//
// ================= Market Data =================
//

/// A numeric metric or the unavailable sentinel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    Unavailable,
}

impl MetricValue {
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => MetricValue::Value(v),
            _ => MetricValue::Unavailable,
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetricValue::Value(v) => serializer.serialize_f64(*v),
            MetricValue::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{:.2}", v),
            MetricValue::Unavailable => write!(f, "{}", UNAVAILABLE),
        }
    }
}

/// Fresh quote fields for a ticker; never cached
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuoteSnapshot {
    pub ticker: String,
    #[serde(rename = "currentPrice")]
    pub current_price: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub pe_ratio: MetricValue,
    pub sector: String,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<u64>,
}

//
// ================= Preferences =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub id: Uuid,
    pub session_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
    /// Injected by the coordinator, never taken from model output
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

//
// ================= Execution =================
//

/// A tool call requested by the planner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    pub tool_name: String,
    pub tool_input: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub observation_id: Uuid,
    pub session_id: Uuid,
    pub round: u32,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub tool_output: serde_json::Value,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

//
// ================= Final Result =================
//

/// Everything one coordinator turn produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: Uuid,
    pub answer: String,
    pub observations: Vec<Observation>,
    pub reasoning_trace: Vec<String>,
    pub execution_time_ms: u64,
}
