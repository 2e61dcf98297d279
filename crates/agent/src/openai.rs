use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

use orderdesk_core::config::LlmConfig;

use crate::llm::{ChatCompletion, ChatRequest, LlmClient, LlmError, ToolInvocation};

/// Chat Completions client with function calling.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| json!({ "type": "function", "function": tool }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(LlmError::MissingCredential)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "llm.openai.request_failed",
                    error = %error,
                    timeout = error.is_timeout(),
                    "chat completion request failed"
                );
                LlmError::Transport(error.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), message });
        }

        let raw =
            response.json::<Value>().await.map_err(|error| LlmError::Decode(error.to_string()))?;
        let completion = parse_completion(&raw)?;
        debug!(
            event_name = "llm.openai.completed",
            model = %self.model,
            tool_call = matches!(completion, ChatCompletion::ToolCalls(_)),
            "chat completion received"
        );
        Ok(completion)
    }
}

/// Reads the first choice. Tool calls win over text; the legacy
/// `function_call` shape is accepted as a single tool call.
pub fn parse_completion(raw: &Value) -> Result<ChatCompletion, LlmError> {
    let message = raw
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| LlmError::Decode("response has no choices[0].message".to_string()))?;

    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        if !calls.is_empty() {
            let invocations = calls
                .iter()
                .map(|call| invocation_from(call.get("function").unwrap_or(&Value::Null)))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ChatCompletion::ToolCalls(invocations));
        }
    }

    if let Some(function) = message.get("function_call").filter(|value| !value.is_null()) {
        return Ok(ChatCompletion::ToolCalls(vec![invocation_from(function)?]));
    }

    match message.get("content").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(ChatCompletion::Text(text.to_string())),
        _ => Ok(ChatCompletion::Empty),
    }
}

fn invocation_from(function: &Value) -> Result<ToolInvocation, LlmError> {
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::Decode("tool call without a function name".to_string()))?;
    let arguments = match function.get("arguments") {
        Some(Value::String(arguments)) => arguments.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Ok(ToolInvocation { name: name.to_string(), arguments })
}
