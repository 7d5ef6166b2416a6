//! Execution engine for planner-requested tool calls
//!
//! Calls run sequentially in the order given. A failing call is recorded and
//! the rest of the batch still runs; unknown tools are skipped.

use crate::models::{ExecutionStatus, Observation, PlanStep, ToolInput};
use crate::tools::ToolRegistry;
use chrono::Utc;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tool calls executed per round; the rest are recorded as skipped
pub const MAX_CALLS_PER_ROUND: usize = 8;

pub struct ExecutionEngine {
    tool_registry: ToolRegistry,
}

impl ExecutionEngine {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self { tool_registry }
    }

    /// Execute one round of calls. Never fails as a whole: each call yields
    /// exactly one observation.
    pub async fn execute_round(
        &self,
        steps: &[PlanStep],
        session_id: Uuid,
        round: u32,
    ) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(steps.len());

        debug!(round, calls = steps.len(), "Starting tool round");

        for (index, step) in steps.iter().enumerate() {
            if index >= MAX_CALLS_PER_ROUND {
                warn!(round, tool_name = %step.tool_name, "Call limit reached; skipping");
                observations.push(self.observation(
                    step,
                    session_id,
                    round,
                    json!({ "error": format!("Call limit of {} per round reached", MAX_CALLS_PER_ROUND) }),
                    0,
                    ExecutionStatus::Skipped,
                ));
                continue;
            }

            let start = Instant::now();

            let tool_input = ToolInput {
                tool_name: step.tool_name.clone(),
                parameters: step.tool_input.clone(),
                session_id,
            };

            let (status, tool_output) = match self.tool_registry.get(&step.tool_name) {
                Some(tool) => match tool.execute(&tool_input).await {
                    Ok(output) if output.success => (ExecutionStatus::Success, output.data),
                    Ok(output) => {
                        let error = output.error.unwrap_or_else(|| "tool reported failure".to_string());
                        warn!(tool_name = %step.tool_name, error = %error, "Tool reported failure");
                        (
                            ExecutionStatus::Failed,
                            json!({ "error": error, "data": output.data }),
                        )
                    }
                    Err(e) => {
                        warn!(
                            tool_name = %step.tool_name,
                            kind = ?e.kind(),
                            error = %e,
                            "Tool execution failed"
                        );
                        (
                            ExecutionStatus::Failed,
                            json!({ "error": e.to_string(), "kind": format!("{:?}", e.kind()) }),
                        )
                    }
                },
                None => {
                    warn!(tool_name = %step.tool_name, "Tool not registered");
                    (
                        ExecutionStatus::Skipped,
                        json!({ "error": format!("Tool not registered: {}", step.tool_name) }),
                    )
                }
            };

            let execution_time_ms = start.elapsed().as_millis() as u64;
            observations.push(self.observation(
                step,
                session_id,
                round,
                tool_output,
                execution_time_ms,
                status,
            ));
        }

        debug!(round, observation_count = observations.len(), "Tool round completed");
        observations
    }

    fn observation(
        &self,
        step: &PlanStep,
        session_id: Uuid,
        round: u32,
        tool_output: serde_json::Value,
        execution_time_ms: u64,
        status: ExecutionStatus,
    ) -> Observation {
        Observation {
            observation_id: Uuid::new_v4(),
            session_id,
            round,
            tool_name: step.tool_name.clone(),
            tool_input: step.tool_input.clone(),
            tool_output,
            execution_time_ms,
            created_at: Utc::now(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPreferenceMemory;
    use crate::tools::tests::fixture_registry;
    use crate::tools::{FINANCIAL_METRICS, RESOLVE_TICKER};
    use std::sync::Arc;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(fixture_registry(Arc::new(InMemoryPreferenceMemory::new())))
    }

    fn step(tool: &str, input: serde_json::Value) -> PlanStep {
        PlanStep {
            tool_name: tool.to_string(),
            tool_input: input,
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_round() {
        let session = Uuid::new_v4();
        let observations = engine()
            .execute_round(
                &[
                    step(FINANCIAL_METRICS, json!({"ticker": "ZZZZZ"})),
                    step("backtester", json!({})),
                    step(RESOLVE_TICKER, json!({"company_name": "Big Fruit Corp"})),
                ],
                session,
                1,
            )
            .await;

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].status, ExecutionStatus::Failed);
        assert!(observations[0].tool_output["error"]
            .as_str()
            .unwrap()
            .contains("ZZZZZ"));
        assert_eq!(observations[0].tool_output["kind"], "NotFound");
        assert_eq!(observations[1].status, ExecutionStatus::Skipped);
        assert_eq!(observations[2].status, ExecutionStatus::Success);
        assert_eq!(observations[2].tool_output["ticker"], "AAPL");
        assert!(observations.iter().all(|o| o.session_id == session && o.round == 1));
    }

    #[tokio::test]
    async fn test_calls_beyond_limit_are_skipped() {
        let steps: Vec<PlanStep> = (0..MAX_CALLS_PER_ROUND + 2)
            .map(|_| step(RESOLVE_TICKER, json!({"company_name": "Apple"})))
            .collect();

        let observations = engine().execute_round(&steps, Uuid::new_v4(), 2).await;

        assert_eq!(observations.len(), MAX_CALLS_PER_ROUND + 2);
        let executed = observations
            .iter()
            .filter(|o| o.status == ExecutionStatus::Success)
            .count();
        assert_eq!(executed, MAX_CALLS_PER_ROUND);
        assert_eq!(observations.last().unwrap().status, ExecutionStatus::Skipped);
    }
}
