//! Text-completion backend
//!
//! Every agent talks to the model through [`TextCompletion`]. The production
//! implementation is an OpenAI-compatible chat-completions client that keeps
//! one long-lived reqwest::Client for connection pooling.

use crate::config::{HttpConfig, LlmConfig};
use crate::error::AssistantError;
use crate::retry::retry_with_backoff;
use crate::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// One instruction + message exchange with the model
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    /// Names and descriptions of the tools the agent may mention
    pub tools: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            tools: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// System prompt with the optional tool allow-list appended
    pub fn full_system_prompt(&self) -> String {
        match &self.tools {
            Some(tool_list) if !tool_list.is_empty() => format!(
                "{}\n\nAvailable tools:\n- {}",
                self.system_prompt,
                tool_list.join("\n- ")
            ),
            _ => self.system_prompt.clone(),
        }
    }
}

/// Opaque text-completion capability
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Stream the answer into `sink` chunk by chunk and return the full text.
    /// Backends without streaming send the whole answer as one chunk.
    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        sink: &mpsc::Sender<String>,
    ) -> Result<String> {
        let text = self.complete(request).await?;
        // A dropped receiver only means nobody is watching.
        let _ = sink.send(text.clone()).await;
        Ok(text)
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
    retry_attempts: usize,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(http.timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            retry_attempts: http.retry_attempts,
        })
    }

    fn build_request(&self, request: &CompletionRequest, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.full_system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_message.clone(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        }
    }

    fn ensure_key(&self) -> Result<()> {
        if self.config.api_key.is_empty() {
            return Err(AssistantError::Configuration(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url);

        retry_with_backoff("llm", self.retry_attempts, || async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    error!("LLM request failed: {}", e);
                    AssistantError::from(e)
                })?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), "LLM error response: {}", error_text);
                return Err(AssistantError::Api {
                    status_code: status.as_u16(),
                    message: error_text,
                });
            }

            Ok(response)
        })
        .await
    }
}

#[async_trait]
impl TextCompletion for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.ensure_key()?;

        let body = self.build_request(request, false);
        debug!(model = %self.config.model, "Calling completion API");

        let response = self.send(&body).await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            AssistantError::Llm(format!("Completion parse error: {}", e))
        })?;

        let answer = extract_answer(parsed)?;
        info!(chars = answer.len(), "Completion received");
        Ok(answer)
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        sink: &mpsc::Sender<String>,
    ) -> Result<String> {
        self.ensure_key()?;

        let body = self.build_request(request, true);
        debug!(model = %self.config.model, "Calling completion API (streaming)");

        let response = self.send(&body).await?;
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut answer = String::new();

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk)? {
                match event {
                    SseEvent::Delta(text) => {
                        answer.push_str(&text);
                        let _ = sink.send(text).await;
                    }
                    SseEvent::Done => break 'outer,
                }
            }
        }

        if answer.is_empty() {
            return Err(AssistantError::Llm("Empty streamed response".to_string()));
        }

        info!(chars = answer.len(), "Streamed completion finished");
        Ok(answer)
    }
}

fn extract_answer(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AssistantError::Llm("No choices in completion response".to_string()))?;

    let content = choice
        .message
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AssistantError::Llm("Empty completion".to_string()));
    }

    Ok(content)
}

/// Locate the JSON object in a model reply that may be wrapped in a
/// markdown fence or surrounded by prose
pub fn json_payload(raw: &str) -> &str {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    }
}

//
// ================= Server-sent events =================
//

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Done,
}

/// Line-buffered decoder for `data: {...}` chunks; tolerates splits mid-line
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();

            if payload == "[DONE]" {
                events.push(SseEvent::Done);
                continue;
            }

            let chunk: StreamChunk = serde_json::from_str(payload).map_err(|e| {
                AssistantError::MalformedResponse(format!("Bad stream chunk: {} | raw={}", e, payload))
            })?;

            if let Some(text) = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|t| !t.is_empty())
            {
                events.push(SseEvent::Delta(text));
            }
        }

        Ok(events)
    }
}

//
// ================= Wire types =================
//

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}
