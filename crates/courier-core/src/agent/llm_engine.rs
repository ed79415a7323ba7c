//! [`ReasoningEngine`] over an OpenAI-compatible chat completion provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use courier_llm::{ChatMessage, ChatRequest, FunctionCall, Provider};
use courier_types::CourierError;
use courier_types::config::LlmConfig;
use courier_types::tool::ToolCall;

use super::orchestrator::{ConversationState, Decision, Entry, ReasoningEngine};

/// Renders the conversation as chat messages, offers the tool schemas, and
/// reads the first choice back as a [`Decision`].
pub struct LlmReasoningEngine {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: Option<i32>,
    temperature: Option<f64>,
}

impl LlmReasoningEngine {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, cfg: &LlmConfig) -> Self {
        Self {
            provider,
            model: cfg.model.clone(),
            max_tokens: Some(cfg.max_tokens),
            temperature: Some(cfg.temperature),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, state: &ConversationState, tools: &[Value]) -> ChatRequest {
        let mut request = ChatRequest::new(self.model.clone(), render_messages(state));
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;
        request.tools = tools.to_vec();
        request
    }
}

#[async_trait]
impl ReasoningEngine for LlmReasoningEngine {
    async fn decide(
        &self,
        state: &ConversationState,
        tools: &[Value],
    ) -> Result<Decision, CourierError> {
        let request = self.build_request(state, tools);
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            "requesting decision"
        );

        let response = self.provider.complete(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CourierError::Provider {
                message: "response has no choices".into(),
            })?;

        let calls = choice.message.tool_calls.unwrap_or_default();
        if calls.is_empty() {
            return Ok(Decision::Final(choice.message.content));
        }
        Ok(Decision::ToolCalls {
            content: choice.message.content,
            calls: calls.into_iter().map(decode_call).collect(),
        })
    }
}

/// Chat messages for the whole transcript, in order.
pub fn render_messages(state: &ConversationState) -> Vec<ChatMessage> {
    state
        .entries()
        .iter()
        .map(|entry| match entry {
            Entry::System(text) => ChatMessage::system(text.clone()),
            Entry::User(text) => ChatMessage::user(text.clone()),
            Entry::Assistant {
                content,
                tool_calls,
            } if tool_calls.is_empty() => ChatMessage::assistant(content.clone()),
            Entry::Assistant {
                content,
                tool_calls,
            } => ChatMessage::assistant_tool_calls(
                content.clone(),
                tool_calls.iter().map(encode_call).collect(),
            ),
            Entry::ToolResult {
                call_id, result, ..
            } => ChatMessage::tool_result(call_id.clone(), result.to_value().to_string()),
            Entry::Correction(note) => ChatMessage::user(format!(
                "Your previous reply was not accepted: {note}. Reply again in the required format."
            )),
        })
        .collect()
}

fn encode_call(call: &ToolCall) -> courier_llm::ToolCall {
    courier_llm::ToolCall {
        id: call.id.clone(),
        call_type: "function".into(),
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        },
    }
}

/// Arguments arrive as a JSON string. Blank means no arguments; text that is
/// not JSON is passed through as a string so schema validation rejects it.
fn decode_call(call: courier_llm::ToolCall) -> ToolCall {
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    ToolCall::new(call.id, call.function.name, arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_llm::{ChatResponse, Choice, ProviderError};
    use courier_types::conversation::Turn;
    use courier_types::tool::{ToolResult, ToolStatus};
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        reply: ChatMessage,
        last: Mutex<Option<ChatRequest>>,
    }

    #[async_trait]
    impl Provider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &ChatRequest) -> courier_llm::Result<ChatResponse> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(ChatResponse {
                id: "r1".into(),
                choices: vec![Choice {
                    index: 0,
                    message: self.reply.clone(),
                    finish_reason: None,
                }],
                usage: None,
                model: "m".into(),
            })
        }
    }

    struct Down;

    #[async_trait]
    impl Provider for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(&self, _request: &ChatRequest) -> courier_llm::Result<ChatResponse> {
            Err(ProviderError::RateLimited { retry_after_ms: 1000 })
        }
    }

    fn engine(reply: ChatMessage) -> (LlmReasoningEngine, Arc<Canned>) {
        let canned = Arc::new(Canned {
            reply,
            last: Mutex::new(None),
        });
        (LlmReasoningEngine::new(canned.clone(), "gpt-test"), canned)
    }

    #[tokio::test]
    async fn text_reply_is_final() {
        let (e, _) = engine(ChatMessage::assistant("You have 3 new emails."));
        let state = ConversationState::new("sys", &[], "hi");
        assert_eq!(
            e.decide(&state, &[]).await.unwrap(),
            Decision::Final("You have 3 new emails.".into())
        );
    }

    #[tokio::test]
    async fn tool_calls_are_decoded() {
        let reply = ChatMessage::assistant_tool_calls(
            "Checking your inbox.",
            vec![
                encode_call(&ToolCall::new("c1", "list_emails", json!({"max_results": 5}))),
                courier_llm::ToolCall {
                    id: "c2".into(),
                    call_type: "function".into(),
                    function: FunctionCall {
                        name: "list_emails".into(),
                        arguments: "".into(),
                    },
                },
                courier_llm::ToolCall {
                    id: "c3".into(),
                    call_type: "function".into(),
                    function: FunctionCall {
                        name: "send_email".into(),
                        arguments: "{not json".into(),
                    },
                },
            ],
        );
        let (e, canned) = engine(reply);
        let tools = vec![json!({"type": "function", "function": {"name": "list_emails"}})];
        let decision = e
            .decide(&ConversationState::new("sys", &[], "list"), &tools)
            .await
            .unwrap();

        let Decision::ToolCalls { content, calls } = decision else {
            panic!("expected tool calls");
        };
        assert_eq!(content, "Checking your inbox.");
        assert_eq!(calls[0], ToolCall::new("c1", "list_emails", json!({"max_results": 5})));
        assert_eq!(calls[1].arguments, json!({}));
        assert_eq!(calls[2].arguments, json!("{not json"));

        let sent = canned.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.model, "gpt-test");
        assert_eq!(sent.tools, tools);
    }

    #[tokio::test]
    async fn provider_errors_map_to_courier_errors() {
        let e = LlmReasoningEngine::new(Arc::new(Down), "m");
        let err = e
            .decide(&ConversationState::new("sys", &[], "x"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Provider { .. }));
    }

    #[test]
    fn renders_full_transcript() {
        let mut state = ConversationState::new("sys", &[Turn::assistant("earlier")], "list my mail");
        let call = ToolCall::new("c1", "list_emails", json!({}));
        for entry in [
            Entry::Assistant {
                content: "Looking now.".into(),
                tool_calls: vec![call],
            },
            Entry::ToolResult {
                call_id: "c1".into(),
                name: "list_emails".into(),
                result: ToolResult::success(
                    ToolStatus::Listed,
                    "Retrieved 1 emails.",
                    json!({"messages": [{"id": "m1"}]}),
                ),
            },
            Entry::Correction("the final answer was empty".into()),
        ] {
            state.push(entry);
        }

        let msgs = render_messages(&state);
        let roles: Vec<&str> = msgs.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "assistant", "user", "assistant", "tool", "user"]);

        assert_eq!(msgs[3].content, "Looking now.");
        let calls = msgs[3].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "list_emails");
        assert_eq!(calls[0].function.arguments, "{}");

        assert_eq!(msgs[4].tool_call_id.as_deref(), Some("c1"));
        let body: Value = serde_json::from_str(&msgs[4].content).unwrap();
        assert_eq!(body["status"], "listed");
        assert!(msgs[5].content.contains("the final answer was empty"));
    }
}
