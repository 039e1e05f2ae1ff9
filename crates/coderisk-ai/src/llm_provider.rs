use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for LLM operations.
pub type LLMResult<T> = anyhow::Result<T>;

/// Performance characteristics of an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCharacteristics {
    pub max_tokens: usize,
    pub avg_latency_ms: u64,
    pub rpm_limit: Option<u64>,
    pub tpm_limit: Option<u64>,
    pub supports_streaming: bool,
    pub supports_functions: bool,
}

/// Configuration for generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: Some(4096),
            top_p: None,
            stop: None,
        }
    }
}

/// A message in the conversation. `Tool` messages carry the result of a
/// prior `ToolCall` back to the model, addressed by `tool_call_id`.
/// `Assistant` messages that requested tool calls carry them in
/// `tool_calls` so a provider can reconstruct its own prior turn when
/// replaying history (required by Anthropic's and OpenAI's wire formats,
/// both of which expect the assistant's tool-use blocks echoed back).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Definition of a tool that can be called by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn parse_arguments<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.function.arguments)
    }
}

/// Response from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub total_tokens: Option<usize>,
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    pub finish_reason: Option<String>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl LLMResponse {
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())
    }

    pub fn is_final(&self) -> bool {
        !self.has_tool_calls() && self.finish_reason.as_deref() != Some("tool_calls")
    }
}

/// Main trait for LLM providers.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        let messages = vec![Message::user(prompt)];
        self.generate_chat(&messages, &GenerationConfig::default())
            .await
    }

    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.generate_chat_with_tools(messages, None, config).await
    }

    /// Generate a chat completion with native tool-calling support. The
    /// default implementation ignores `tools` and falls back to plain chat;
    /// providers that support native tool calling must override this.
    async fn generate_chat_with_tools(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    fn supports_tool_calling(&self) -> bool {
        self.characteristics().supports_functions
    }

    async fn is_available(&self) -> bool;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn characteristics(&self) -> ProviderCharacteristics;

    fn context_window(&self) -> usize {
        self.characteristics().max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_without_tool_calls_serializes_no_tool_calls_field() {
        let msg = Message::assistant("hello", vec![]);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn response_is_final_without_pending_tool_calls() {
        let response = LLMResponse {
            content: "done".to_string(),
            total_tokens: None,
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: Some("stop".to_string()),
            model: "test".to_string(),
            tool_calls: None,
        };
        assert!(response.is_final());
    }

    #[test]
    fn response_with_tool_calls_is_not_final() {
        let response = LLMResponse {
            content: String::new(),
            total_tokens: None,
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: Some("tool_calls".to_string()),
            model: "test".to_string(),
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: "query_ownership".to_string(),
                    arguments: "{}".to_string(),
                },
            }]),
        };
        assert!(!response.is_final());
        assert!(response.has_tool_calls());
    }
}
