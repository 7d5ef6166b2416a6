//! Planner trait and implementations
//!
//! The planner decides which tool calls to make next, given the query and
//! everything observed so far. An empty batch means "ready to answer".

use crate::models::{Observation, PlanStep, Preference};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod llm;
pub use llm::LlmPlanner;

/// Inputs for one planning round
pub struct PlanningContext<'a> {
    pub query: &'a str,
    pub preferences: &'a [Preference],
    pub observations: &'a [Observation],
    pub round: u32,
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_calls(&self, context: &PlanningContext<'_>) -> Result<Vec<PlanStep>>;
}

/// Planner that replays fixed batches, then reports it is done.
/// Keeps the coordinator runnable without a model.
pub struct ScriptedPlanner {
    rounds: Mutex<VecDeque<Vec<PlanStep>>>,
}

impl ScriptedPlanner {
    pub fn new(rounds: Vec<Vec<PlanStep>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
        }
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn next_calls(&self, _context: &PlanningContext<'_>) -> Result<Vec<PlanStep>> {
        let mut rounds = match self.rounds.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(rounds.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_planner_drains_then_finishes() {
        let planner = ScriptedPlanner::new(vec![vec![PlanStep {
            tool_name: "resolve_ticker".into(),
            tool_input: json!({"company_name": "Apple"}),
        }]]);
        let context = PlanningContext {
            query: "Apple price",
            preferences: &[],
            observations: &[],
            round: 1,
        };

        assert_eq!(planner.next_calls(&context).await.unwrap().len(), 1);
        assert!(planner.next_calls(&context).await.unwrap().is_empty());
    }
}
