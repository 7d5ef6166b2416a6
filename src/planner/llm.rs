//! Model-driven planner
//!
//! Asks the completion backend for the next batch of tool calls and parses
//! the reply as untrusted JSON.

use crate::error::AssistantError;
use crate::llm::{json_payload, CompletionRequest, TextCompletion};
use crate::memory::format_preferences;
use crate::models::{ExecutionStatus, Observation, PlanStep};
use crate::planner::{Planner, PlanningContext};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const PLANNER_PROMPT: &str = r#"You are the Lead Financial Analyst, coordinating a team of specialist tools
to answer the user's financial question.

Workflow:
1. Identify every company in the question.
2. Call resolve_ticker for each company name before anything else.
3. With resolved tickers, call financial_metrics and/or news_research as needed.
4. Use preference_memory to store preferences the user states, or list them when relevant.
5. When the observations are enough to answer, request no more calls.

Never pass TICKER_NOT_FOUND or TICKER_NOT_FOUND_ERROR to another tool; the final
answer will explain that the company could not be identified.

Return ONLY valid JSON, no explanation text:
{"tool_calls": [{"tool": "resolve_ticker", "input": {"company_name": "Apple"}}]}

Return {"tool_calls": []} when you are ready to answer."#;

pub struct LlmPlanner {
    llm: Arc<dyn TextCompletion>,
    tool_descriptions: Vec<String>,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn TextCompletion>, tool_descriptions: Vec<String>) -> Self {
        Self {
            llm,
            tool_descriptions,
        }
    }

    fn build_message(&self, context: &PlanningContext<'_>) -> String {
        format!(
            "QUESTION:\n{}\n\nUSER PREFERENCES:\n{}\n\nOBSERVATIONS SO FAR (round {}):\n{}",
            context.query,
            format_preferences(context.preferences),
            context.round,
            format_observations(context.observations),
        )
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn next_calls(&self, context: &PlanningContext<'_>) -> Result<Vec<PlanStep>> {
        let request = CompletionRequest::new(PLANNER_PROMPT, self.build_message(context))
            .with_tools(self.tool_descriptions.clone());

        let response = self.llm.complete(&request).await?;
        let steps = parse_plan_response(&response)?;

        debug!(round = context.round, calls = steps.len(), "Planner requested tool calls");
        Ok(steps)
    }
}

/// Compact rendering of observations for prompts
pub fn format_observations(observations: &[Observation]) -> String {
    if observations.is_empty() {
        return "(none)".to_string();
    }

    observations
        .iter()
        .map(|o| {
            let status = match o.status {
                ExecutionStatus::Success => "ok",
                ExecutionStatus::Failed => "failed",
                ExecutionStatus::Skipped => "skipped",
            };
            format!("- {} {} [{}] -> {}", o.tool_name, o.tool_input, status, o.tool_output)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse `{"tool_calls": [{"tool": ..., "input": {...}}]}`
fn parse_plan_response(response: &str) -> Result<Vec<PlanStep>> {
    let json: Value = serde_json::from_str(json_payload(response)).map_err(|e| {
        AssistantError::MalformedResponse(format!(
            "Failed to parse planner response: {} | raw={}",
            e, response
        ))
    })?;

    let calls = json
        .get("tool_calls")
        .ok_or_else(|| AssistantError::MalformedResponse("No tool_calls in response".to_string()))?
        .as_array()
        .ok_or_else(|| {
            AssistantError::MalformedResponse("tool_calls is not an array".to_string())
        })?;

    let mut steps = Vec::with_capacity(calls.len());

    for call in calls {
        let tool_name = call
            .get("tool")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AssistantError::MalformedResponse("Missing tool name".to_string()))?
            .to_string();

        let tool_input = call
            .get("input")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        steps.push(PlanStep {
            tool_name,
            tool_input,
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletion;
    use serde_json::json;

    #[test]
    fn test_parse_tool_calls() {
        let steps = parse_plan_response(
            r#"```json
{"tool_calls": [
  {"tool": "resolve_ticker", "input": {"company_name": "Apple"}},
  {"tool": "resolve_ticker", "input": {"company_name": "Google"}}
]}
```"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].tool_name, "resolve_ticker");
        assert_eq!(steps[1].tool_input, json!({"company_name": "Google"}));
    }

    #[test]
    fn test_parse_empty_batch_and_missing_input() {
        assert!(parse_plan_response(r#"{"tool_calls": []}"#).unwrap().is_empty());

        let steps = parse_plan_response(r#"{"tool_calls": [{"tool": "preference_memory"}]}"#).unwrap();
        assert_eq!(steps[0].tool_input, json!({}));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in [
            "Let me look that up.",
            r#"{"steps": []}"#,
            r#"{"tool_calls": "resolve_ticker"}"#,
            r#"{"tool_calls": [{"input": {}}]}"#,
        ] {
            assert!(
                matches!(parse_plan_response(raw), Err(AssistantError::MalformedResponse(_))),
                "{}",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_tools_and_context() {
        let llm = Arc::new(ScriptedCompletion::new([r#"{"tool_calls": []}"#]));
        let planner = LlmPlanner::new(
            llm.clone(),
            vec!["resolve_ticker: Convert a company name to its stock ticker.".into()],
        );
        let preferences = vec![crate::models::Preference {
            id: uuid::Uuid::new_v4(),
            session_id: uuid::Uuid::new_v4(),
            content: "Prefers P/E analysis".into(),
            created_at: chrono::Utc::now(),
        }];

        let steps = planner
            .next_calls(&PlanningContext {
                query: "Compare P/E ratios of Apple and Google",
                preferences: &preferences,
                observations: &[],
                round: 1,
            })
            .await
            .unwrap();
        assert!(steps.is_empty());

        let request = &llm.requests.lock().unwrap()[0];
        assert!(request.full_system_prompt().contains("- resolve_ticker: Convert"));
        assert!(request.user_message.contains("Compare P/E ratios of Apple and Google"));
        assert!(request.user_message.contains("- Prefers P/E analysis"));
    }
}
