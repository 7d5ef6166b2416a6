//! Coordinator - runs one conversational turn
//!
//! PLAN → EXECUTE → OBSERVE, repeated until the planner is satisfied or the
//! round cap is hit, then SYNTHESIZE a streamed answer from the observations.

use crate::error::AssistantError;
use crate::execution::ExecutionEngine;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::memory::{format_preferences, PreferenceMemory};
use crate::models::{Observation, Preference, Turn};
use crate::planner::llm::format_observations;
use crate::planner::{Planner, PlanningContext};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MAX_TOOL_ROUNDS: u32 = 5;

const SYNTHESIS_PROMPT: &str = r#"You are the Lead Financial Analyst. Write the final answer to the user's
question using ONLY the observations gathered by your specialist tools.

Response standards:
- Give a complete, synthesized answer, not a list of raw tool outputs.
- Include the relevant financial metrics with context, and compare them when asked.
- A value of "N/A" means the metric is unavailable; say so rather than guessing.
- If a ticker is TICKER_NOT_FOUND, say the company could not be identified.
  If it is TICKER_NOT_FOUND_ERROR, say the lookup failed and may be retried.
- If a tool failed, mention which information is missing.
- Use professional financial terminology and respect the user's preferences."#;

pub struct Coordinator {
    planner: Box<dyn Planner>,
    execution_engine: ExecutionEngine,
    memory: Arc<dyn PreferenceMemory>,
    llm: Arc<dyn TextCompletion>,
}

impl Coordinator {
    pub fn new(
        planner: Box<dyn Planner>,
        execution_engine: ExecutionEngine,
        memory: Arc<dyn PreferenceMemory>,
        llm: Arc<dyn TextCompletion>,
    ) -> Self {
        Self {
            planner,
            execution_engine,
            memory,
            llm,
        }
    }

    /// Run one turn. Answer text is streamed into `sink` as it arrives and
    /// also returned in full.
    pub async fn run(
        &self,
        query: &str,
        session_id: Uuid,
        sink: &mpsc::Sender<String>,
    ) -> Result<Turn> {
        let start_time = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::InvalidInput("query is empty".to_string()));
        }

        info!(session = %session_id, query = %query, "Coordinator: starting turn");

        let mut reasoning_trace = vec!["INPUT: Query received".to_string()];
        let mut observations: Vec<Observation> = Vec::new();
        let mut preferences = self.load_preferences(session_id).await;
        let mut finished = false;

        for round in 1..=MAX_TOOL_ROUNDS {
            let context = PlanningContext {
                query,
                preferences: &preferences,
                observations: &observations,
                round,
            };

            let steps = match self.planner.next_calls(&context).await {
                Ok(steps) => steps,
                Err(e) => {
                    warn!(round, kind = ?e.kind(), "Planner failed: {}", e);
                    reasoning_trace.push(format!(
                        "PLAN: Planner failed in round {}; answering from current observations",
                        round
                    ));
                    finished = true;
                    break;
                }
            };

            if steps.is_empty() {
                reasoning_trace.push(format!("PLAN: Ready to answer after round {}", round - 1));
                finished = true;
                break;
            }

            reasoning_trace.push(format!("PLAN: Round {} requests {} call(s)", round, steps.len()));

            let round_observations = self
                .execution_engine
                .execute_round(&steps, session_id, round)
                .await;

            for obs in &round_observations {
                reasoning_trace.push(format!(
                    "OBSERVE: {} ({:?}) - {} ms",
                    obs.tool_name, obs.status, obs.execution_time_ms
                ));
            }

            observations.extend(round_observations);
            preferences = self.load_preferences(session_id).await;
        }

        if !finished {
            warn!(rounds = MAX_TOOL_ROUNDS, "Round limit reached");
            reasoning_trace.push(format!("PLAN: Round limit of {} reached", MAX_TOOL_ROUNDS));
        }

        reasoning_trace.push("SYNTHESIZE: Composing answer".to_string());
        let request = CompletionRequest::new(
            SYNTHESIS_PROMPT,
            format!(
                "QUESTION:\n{}\n\nUSER PREFERENCES:\n{}\n\nOBSERVATIONS:\n{}",
                query,
                format_preferences(&preferences),
                format_observations(&observations),
            ),
        );

        let answer = self.llm.complete_streaming(&request, sink).await?;
        reasoning_trace.push("COMPLETE: Answer delivered".to_string());

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            session = %session_id,
            observations = observations.len(),
            execution_time_ms,
            "Coordinator: turn complete"
        );

        Ok(Turn {
            session_id,
            answer,
            observations,
            reasoning_trace,
            execution_time_ms,
        })
    }

    async fn load_preferences(&self, session_id: Uuid) -> Vec<Preference> {
        match self.memory.list(session_id).await {
            Ok(preferences) => {
                debug!(count = preferences.len(), "Loaded preferences");
                preferences
            }
            Err(e) => {
                warn!(kind = ?e.kind(), "Failed to load preferences: {}", e);
                Vec::new()
            }
        }
    }
}
