//! Financial Analyst Agents
//!
//! A conversational assistant for questions about public companies:
//! - Resolves company names to tickers from a local store, learning new
//!   companies through web search when the store misses
//! - Fetches live market metrics and summarizes recent news per ticker
//! - Remembers user preferences per session
//! - Coordinates the specialists with a bounded plan/execute loop and
//!   streams the final answer
//!
//! TURN LOOP:
//! QUERY → PLAN → EXECUTE → OBSERVE → (REPLAN)* → SYNTHESIZE

pub mod agent;
pub mod app;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod finder;
pub mod llm;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod news;
pub mod planner;
pub mod quotes;
pub mod resolver;
pub mod retry;
pub mod search;
pub mod store;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AssistantError, Result};

// Re-export common types
pub use models::*;
