//! Admissions chat assistant driven by OpenAI chat completions.
//!
//! [`ChatAgent`] is constructed explicitly from config plus the
//! `OPENAI_API_KEY` environment variable and injected wherever chat is
//! served; there is no lazily initialized global. Each question runs a
//! bounded tool-calling loop: the model is offered the catalog tools from
//! [`ToolRegistry`], requested calls are executed against the database, and
//! the loop ends when the model answers in plain text or the turn limit
//! is reached.
//!
//! Retry strategy for the completions endpoint (same discipline as the
//! rest of the codebase's OpenAI calls):
//! - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, ...)
//! - other 4xx → fail immediately
//! - network errors → retry

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::time::Duration;

use crate::config::AgentConfig;
use crate::tools::{ToolContext, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are a helpful university admissions assistant. Your job is to \
help students find and compare universities based on their preferences and qualifications.\n\n\
IMPORTANT RULES:\n\
- ALWAYS use tools to look up information. Never guess or make up data.\n\
- If the user asks what countries/programs/exams are available, use get_available_filters.\n\
- Use search_universities to find matching universities and their IDs.\n\
- Use get_university with the numeric ID to get detailed requirements.\n\
- If no results are found, use get_available_filters to suggest valid options.\n\
- Be concise but helpful. Format results clearly for easy reading.\n\
- When comparing, highlight key differences (location, programs, requirements).";

/// One prior message in the conversation, as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// The assistant's answer plus the names of the tools it invoked.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub tool_calls: Vec<String>,
}

pub struct ChatAgent {
    config: AgentConfig,
    api_key: String,
    client: reqwest::Client,
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl ChatAgent {
    /// Build an agent over the catalog pool, reading `OPENAI_API_KEY` from
    /// the environment.
    pub fn from_env(config: &AgentConfig, pool: SqlitePool) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
            registry: ToolRegistry::with_builtins(),
            ctx: ToolContext::new(pool),
        })
    }

    /// Answer one user message, given optional prior history.
    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<ChatOutcome> {
        if message.trim().is_empty() {
            bail!("message must not be empty");
        }

        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        for turn in history {
            // Only user/assistant turns are forwarded to the model
            if turn.role == "user" || turn.role == "assistant" {
                messages.push(json!({ "role": turn.role, "content": turn.content }));
            }
        }
        messages.push(json!({ "role": "user", "content": message }));

        let tool_schemas = self.tool_schemas();
        let mut tool_calls_made: Vec<String> = Vec::new();

        for _ in 0..self.config.max_turns {
            let body = json!({
                "model": self.config.model,
                "temperature": 0,
                "messages": messages,
                "tools": tool_schemas,
            });

            let completion = self.post_completion(&body).await?;
            let assistant = completion["choices"][0]["message"].clone();
            if assistant.is_null() {
                bail!("Invalid completions response: missing choices[0].message");
            }

            let requested_calls = assistant["tool_calls"].as_array().cloned();
            messages.push(assistant);

            let Some(requested_calls) = requested_calls.filter(|c| !c.is_empty()) else {
                let response = messages
                    .last()
                    .and_then(|m| m["content"].as_str())
                    .unwrap_or_default()
                    .to_string();
                return Ok(ChatOutcome {
                    response,
                    tool_calls: tool_calls_made,
                });
            };

            for call in &requested_calls {
                let call_id = call["id"].as_str().unwrap_or_default().to_string();
                let name = call["function"]["name"].as_str().unwrap_or_default();
                let result = self.execute_tool(name, &call["function"]["arguments"]).await;
                tool_calls_made.push(name.to_string());

                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": result.to_string(),
                }));
            }
        }

        bail!(
            "Assistant did not produce an answer within {} tool-calling turns",
            self.config.max_turns
        )
    }

    /// Run one requested tool call. Failures are reported back to the model
    /// as an error payload rather than aborting the conversation.
    async fn execute_tool(&self, name: &str, arguments: &Value) -> Value {
        let Some(tool) = self.registry.find(name) else {
            return json!({ "error": format!("No tool registered with name: {}", name) });
        };

        let params: Value = arguments
            .as_str()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| json!({}));

        match tool.execute(params, &self.ctx).await {
            Ok(value) => value,
            Err(e) => json!({ "error": e.to_string() }),
        }
    }

    /// Tool definitions in the chat-completions `tools` format.
    fn tool_schemas(&self) -> Vec<Value> {
        self.registry
            .tools()
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters_schema(),
                    }
                })
            })
            .collect()
    }

    async fn post_completion(&self, body: &Value) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429): don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}
