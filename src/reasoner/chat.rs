// ABOUTME: ChatReasoner - OpenAI-compatible chat-completions backend (Groq by default).
// ABOUTME: Maps prompts/transcripts to chat messages and tool calls back to Decisions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Decision, Prompt, Reasoner};
use crate::agent::{Step, Transcript};
use crate::error::ReasonerError;
use crate::tool::ToolDescriptor;

/// Base URL of Groq's OpenAI-compatible API.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model served by Groq.
pub const GROQ_DEFAULT_MODEL: &str = "llama3-70b-8192";

/// Name of the synthetic function offered when the agent has coworkers.
pub const DELEGATE_FUNCTION: &str = "delegate_work";

/// Connection and sampling settings for a chat-completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasonerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub request_timeout: Duration,
}

impl ReasonerConfig {
    /// Create a config for any OpenAI-compatible endpoint.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Groq defaults: `llama3-70b-8192` at temperature 0.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new(GROQ_BASE_URL, api_key, GROQ_DEFAULT_MODEL).temperature(0.0)
    }

    /// Set the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the HTTP request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
}

/// Chat message format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool call in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: ChatFunctionCall,
}

/// Function call details; `arguments` is a JSON-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Tool definition.
#[derive(Debug, Serialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ChatFunction,
}

#[derive(Debug, Serialize)]
pub struct ChatFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<&ToolDescriptor> for ChatTool {
    fn from(tool: &ToolDescriptor) -> Self {
        ChatTool {
            tool_type: "function".to_string(),
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

/// API error response.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct DelegateArgs {
    coworker: String,
    task: String,
    #[serde(default)]
    context: Option<String>,
}

fn delegate_tool(coworkers: &[String]) -> ChatTool {
    ChatTool {
        tool_type: "function".to_string(),
        function: ChatFunction {
            name: DELEGATE_FUNCTION.to_string(),
            description: format!(
                "Delegate the current task to one of your coworkers: {}. \
                 Give them everything they need to know.",
                coworkers.join(", ")
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "coworker": { "type": "string", "enum": coworkers },
                    "task": { "type": "string", "description": "What the coworker should do" },
                    "context": { "type": "string", "description": "Background the coworker needs" }
                },
                "required": ["coworker", "task"]
            }),
        },
    }
}

fn system_message(prompt: &Prompt) -> String {
    let mut system = format!("You are {}. {}\nYour personal goal is: {}", prompt.role, prompt.backstory, prompt.goal);
    if !prompt.coworkers.is_empty() {
        system.push_str(&format!(
            "\nYou can delegate work with `{}` to these coworkers: {}.",
            DELEGATE_FUNCTION,
            prompt.coworkers.join(", ")
        ));
    }
    system
}

fn task_message(prompt: &Prompt) -> String {
    let mut user = format!("Current task: {}", prompt.description);
    if !prompt.expected_output.is_empty() {
        user.push_str(&format!(
            "\n\nThis is the expected criteria for your final answer: {}",
            prompt.expected_output
        ));
    }
    if !prompt.context.is_empty() {
        user.push_str(&format!(
            "\n\nThis is the context you're working with:\n{}",
            prompt.context
        ));
    }
    user.push_str(&format!(
        "\n\nIteration {} of {}. When you have the final answer, reply with it directly instead of calling a tool.",
        prompt.iteration, prompt.max_iterations
    ));
    user
}

fn assistant_call(id: String, name: &str, arguments: String) -> ChatMessage {
    ChatMessage {
        role: "assistant".to_string(),
        content: None,
        tool_calls: Some(vec![ChatToolCall {
            id,
            call_type: "function".to_string(),
            function: ChatFunctionCall {
                name: name.to_string(),
                arguments,
            },
        }]),
        tool_call_id: None,
    }
}

fn tool_reply(id: String, content: String) -> ChatMessage {
    ChatMessage {
        role: "tool".to_string(),
        content: Some(content),
        tool_calls: None,
        tool_call_id: Some(id),
    }
}

/// Replay the transcript as assistant tool-call / tool-result pairs.
fn transcript_messages(transcript: &Transcript) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    for (n, entry) in transcript.entries().iter().enumerate() {
        let id = format!("call_{}", n + 1);
        match &entry.step {
            Step::ToolCall {
                tool,
                arguments,
                output,
                is_error,
            } => {
                messages.push(assistant_call(id.clone(), tool, arguments.to_string()));
                let content = if *is_error {
                    format!("Error: {}", output)
                } else {
                    output.clone()
                };
                messages.push(tool_reply(id, content));
            }
            Step::Delegation { to, instructions } => {
                let args = serde_json::json!({ "coworker": to, "task": instructions });
                messages.push(assistant_call(id.clone(), DELEGATE_FUNCTION, args.to_string()));
                messages.push(tool_reply(
                    id,
                    format!("{} ({}) has taken over this task.", to, entry.role),
                ));
            }
            Step::Rejected { reason } => {
                messages.push(ChatMessage::text(
                    "user",
                    format!("Your last step was rejected: {}", reason),
                ));
            }
        }
    }
    messages
}

/// Build the chat request for one decision.
pub fn build_request(
    config: &ReasonerConfig,
    prompt: &Prompt,
    tools: &[ToolDescriptor],
    transcript: &Transcript,
) -> ChatRequest {
    let mut messages = vec![
        ChatMessage::text("system", system_message(prompt)),
        ChatMessage::text("user", task_message(prompt)),
    ];
    messages.extend(transcript_messages(transcript));

    let mut chat_tools: Vec<ChatTool> = tools.iter().map(ChatTool::from).collect();
    if !prompt.coworkers.is_empty() {
        chat_tools.push(delegate_tool(&prompt.coworkers));
    }

    ChatRequest {
        model: config.model.clone(),
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        tools: chat_tools,
    }
}

/// Turn a chat response into exactly one decision.
///
/// The first tool call wins; otherwise the message text is the final answer.
pub fn parse_decision(response: ChatResponse) -> Result<Decision, ReasonerError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ReasonerError::Protocol("response has no choices".into()))?;

    if let Some(call) = choice.message.tool_calls.and_then(|calls| calls.into_iter().next()) {
        if call.function.name == DELEGATE_FUNCTION {
            let args: DelegateArgs = serde_json::from_str(&call.function.arguments)
                .map_err(|e| ReasonerError::Protocol(format!("bad {} arguments: {}", DELEGATE_FUNCTION, e)))?;
            let instructions = match args.context {
                Some(context) if !context.is_empty() => format!("{}\n\nContext: {}", args.task, context),
                _ => args.task,
            };
            return Ok(Decision::delegate(args.coworker, instructions));
        }

        // Malformed arguments are handed to the tool as-is; it reports them as invalid.
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or(serde_json::Value::String(call.function.arguments));
        return Ok(Decision::tool_call(call.function.name, arguments));
    }

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(Decision::final_answer(text)),
        _ => Err(ReasonerError::Protocol(format!(
            "empty response (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("none")
        ))),
    }
}

/// Reasoner backed by an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct ChatReasoner {
    config: ReasonerConfig,
    http: reqwest::Client,
}

impl ChatReasoner {
    /// Create a new chat reasoner.
    pub fn new(config: ReasonerConfig) -> Result<Self, ReasonerError> {
        if config.api_key.trim().is_empty() {
            return Err(ReasonerError::Configuration("API key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// The active configuration.
    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }
}

#[async_trait]
impl Reasoner for ChatReasoner {
    async fn decide(
        &self,
        prompt: &Prompt,
        tools: &[ToolDescriptor],
        transcript: &Transcript,
    ) -> Result<Decision, ReasonerError> {
        let request = build_request(&self.config, prompt, tools, transcript);
        tracing::debug!(
            model = %self.config.model,
            role = %prompt.role,
            messages = request.messages.len(),
            "Requesting decision"
        );

        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ReasonerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: ChatResponse = response.json().await?;
        parse_decision(response)
    }
}
