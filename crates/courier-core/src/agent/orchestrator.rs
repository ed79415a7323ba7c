//! Bounded tool-orchestration loop.
//!
//! ```text
//! user text + prior turns
//!   |
//!   v
//! ConversationState (system instruction, history, user turn)
//!   |
//!   v
//! ReasoningEngine::decide  <-------------------------------+
//!   |                                                      |
//!   +-- ToolCalls: invoke each via ToolRegistry, in order, |
//!   |              append results -------------------------+
//!   |
//!   +-- Final: validate against AnswerFormat
//!                ok  -> return FinalAnswer
//!                bad -> append correction note, next round
//! ```
//!
//! `max_rounds` bounds the rounds that act on a decision: a tool-call
//! batch, a rejected final answer, or an empty decision. Once the bound is
//! used up the engine is asked one last time and only a valid final answer
//! is accepted; tool calls chosen then are not executed and the run fails
//! with `OrchestrationStalled`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use courier_types::CourierError;
use courier_types::config::AgentConfig;
use courier_types::conversation::{AnswerFormat, FinalAnswer, Role, Turn};
use courier_types::tool::{ToolCall, ToolResult};

use crate::tools::registry::ToolRegistry;

/// What the reasoning engine wants next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Execute these calls, in order, then ask again. `content` is any
    /// text the engine wrote alongside the calls.
    ToolCalls {
        content: String,
        calls: Vec<ToolCall>,
    },
    /// Candidate final answer; validated before it is accepted.
    Final(String),
}

/// The external model that chooses tools and writes answers.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Next step given the conversation so far and the available tools
    /// (OpenAI function-calling schemas).
    async fn decide(
        &self,
        state: &ConversationState,
        tools: &[Value],
    ) -> Result<Decision, CourierError>;
}

/// One entry in a run's transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    System(String),
    User(String),
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        result: ToolResult,
    },
    /// Feedback after a rejected final answer.
    Correction(String),
}

/// Per-run transcript plus the record of successful calls by id.
///
/// Never shared between runs.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    entries: Vec<Entry>,
    completed: HashMap<String, ToolResult>,
}

impl ConversationState {
    pub fn new(system: impl Into<String>, prior: &[Turn], user_text: impl Into<String>) -> Self {
        let mut entries = Vec::with_capacity(prior.len() + 2);
        entries.push(Entry::System(system.into()));
        entries.extend(prior.iter().map(|t| match t.role {
            Role::User => Entry::User(t.content.clone()),
            Role::Assistant => Entry::Assistant {
                content: t.content.clone(),
                tool_calls: Vec::new(),
            },
        }));
        entries.push(Entry::User(user_text.into()));
        Self {
            entries,
            completed: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Result of an earlier successful call with this id, if any.
    pub fn completed(&self, call_id: &str) -> Option<&ToolResult> {
        self.completed.get(call_id)
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    fn record(&mut self, call: &ToolCall, result: ToolResult) {
        if !result.is_error() {
            self.completed.insert(call.id.clone(), result.clone());
        }
        self.push(Entry::ToolResult {
            call_id: call.id.clone(),
            name: call.name.clone(),
            result,
        });
    }
}

/// Static settings of an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_rounds: u32,
    pub answer_format: AnswerFormat,
    /// Replaces the generated system instruction when set.
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for OrchestratorConfig {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            max_rounds: cfg.max_rounds.max(1),
            answer_format: cfg.answer_format,
            system_prompt: cfg.system_prompt.clone(),
        }
    }
}

/// Drives one request at a time through the engine and the tool registry.
///
/// Holds only immutable shared parts; independent requests may call
/// [`run`](Self::run) concurrently.
pub struct Orchestrator {
    engine: Arc<dyn ReasoningEngine>,
    tools: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        tools: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            engine,
            tools,
            config,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The system instruction a run starts with.
    pub fn system_instruction(&self) -> String {
        match &self.config.system_prompt {
            Some(custom) => custom.clone(),
            None => default_system_prompt(self.config.answer_format, &self.tools.list()),
        }
    }

    /// Answer `user_text`, using `prior` turns as context.
    pub async fn run(&self, user_text: &str, prior: &[Turn]) -> Result<FinalAnswer, CourierError> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("orchestrate", %run_id);
        self.run_inner(user_text, prior).instrument(span).await
    }

    async fn run_inner(&self, user_text: &str, prior: &[Turn]) -> Result<FinalAnswer, CourierError> {
        let max_rounds = self.config.max_rounds.max(1);
        let schemas = self.tools.schemas();
        let mut state = ConversationState::new(self.system_instruction(), prior, user_text);

        let mut rounds = 0;
        loop {
            let decision = self.engine.decide(&state, &schemas).await?;
            let round = rounds + 1;
            let exhausted = rounds >= max_rounds;
            match decision {
                Decision::Final(text) => match self.config.answer_format.parse(&text) {
                    Ok(answer) => {
                        info!(round, "orchestration complete");
                        return Ok(answer);
                    }
                    Err(note) if exhausted => {
                        warn!(%note, "final answer rejected after the last round");
                        break;
                    }
                    Err(note) => {
                        warn!(round, %note, "final answer rejected");
                        state.push(Entry::Assistant {
                            content: text,
                            tool_calls: Vec::new(),
                        });
                        state.push(Entry::Correction(note));
                    }
                },
                Decision::ToolCalls { calls, .. } if calls.is_empty() => {
                    if exhausted {
                        break;
                    }
                    warn!(round, "engine returned neither tool calls nor an answer");
                    state.push(Entry::Correction(
                        "no tool call and no answer was given".into(),
                    ));
                }
                Decision::ToolCalls { calls, .. } if exhausted => {
                    warn!(
                        tool_count = calls.len(),
                        "tool calls requested after the last round; not executed"
                    );
                    break;
                }
                Decision::ToolCalls { content, calls } => {
                    debug!(round, tool_count = calls.len(), "executing tool calls");
                    state.push(Entry::Assistant {
                        content,
                        tool_calls: calls.clone(),
                    });
                    for call in &calls {
                        let result = self.execute(&state, call).await?;
                        state.record(call, result);
                    }
                }
            }
            rounds = round;
        }

        warn!(rounds = max_rounds, "round bound reached without a final answer");
        Err(CourierError::OrchestrationStalled { rounds: max_rounds })
    }

    /// Run one call, replaying the recorded result for an id that already
    /// succeeded in this run.
    async fn execute(
        &self,
        state: &ConversationState,
        call: &ToolCall,
    ) -> Result<ToolResult, CourierError> {
        if let Some(done) = state.completed(&call.id) {
            debug!(call_id = %call.id, tool = %call.name, "call id already completed; replaying result");
            return Ok(done.clone());
        }

        match self.tools.invoke(call).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_tool_recoverable() => {
                warn!(call_id = %call.id, tool = %call.name, error = %e, "tool failed; reporting to engine");
                Ok(ToolResult::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

/// Instruction describing the tools and the expected answer shape.
pub fn default_system_prompt(format: AnswerFormat, tools: &[String]) -> String {
    let mut prompt = String::from(
        "You are an assistant that manages the user's email and browses the web on their behalf. \
         Answer requests about reading, searching, and sending email, and questions that need \
         web content, by calling the available tools.",
    );
    if !tools.is_empty() {
        prompt.push_str("\n\nAvailable tools: ");
        prompt.push_str(&tools.join(", "));
        prompt.push('.');
    }
    if tools.iter().any(|t| t == "web_search") {
        prompt.push_str(
            "\nUse `web_search` for general queries, `browse_website` for static content \
             from a URL, and `browse_website_dynamic` for pages that need JavaScript.",
        );
    }
    prompt.push_str(
        "\nOnly send an email when the user explicitly asks for it. \
         If a tool reports an error, you may retry with corrected arguments or explain the problem.",
    );
    match format {
        AnswerFormat::Plain => {
            prompt.push_str("\n\nReply to the user in plain language.");
        }
        AnswerFormat::Sourced => {
            prompt.push_str(
                "\n\nReply with only a JSON object of the form \
                 {\"answer\": \"<concise answer>\", \"source\": \"<URL or reference>\"}. \
                 Always include a source.",
            );
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::tool::ToolStatus;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::tools::registry::Tool;

    /// Replays scripted decisions; records the state it was shown.
    struct Scripted {
        decisions: Mutex<Vec<Decision>>,
        seen: Mutex<Vec<Vec<Entry>>>,
    }

    impl Scripted {
        fn new(mut decisions: Vec<Decision>) -> Self {
            decisions.reverse();
            Self {
                decisions: Mutex::new(decisions),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReasoningEngine for Scripted {
        async fn decide(
            &self,
            state: &ConversationState,
            _tools: &[Value],
        ) -> Result<Decision, CourierError> {
            self.seen.lock().unwrap().push(state.entries().to_vec());
            self.decisions
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CourierError::Provider {
                    message: "script exhausted".into(),
                })
        }
    }

    /// Always asks for another tool call.
    struct Looping;

    #[async_trait]
    impl ReasoningEngine for Looping {
        async fn decide(
            &self,
            state: &ConversationState,
            _tools: &[Value],
        ) -> Result<Decision, CourierError> {
            let n = state.entries().len();
            Ok(tool_calls(vec![ToolCall::new(
                format!("c{n}"),
                "count",
                json!({}),
            )]))
        }
    }

    #[derive(Default)]
    struct CountTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for CountTool {
        fn name(&self) -> &str {
            "count"
        }
        fn description(&self) -> &str {
            "counts"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value) -> Result<Value, CourierError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ToolResult::success(ToolStatus::Listed, format!("call {n}"), json!({"n": n})).to_value())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "flaky"
        }
        fn description(&self) -> &str {
            "fails"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: Value) -> Result<Value, CourierError> {
            Err(CourierError::FetchFailed {
                url: "https://down.example".into(),
                cause: "HTTP 503".into(),
            })
        }
    }

    struct NoCredentialTool;

    #[async_trait]
    impl Tool for NoCredentialTool {
        fn name(&self) -> &str {
            "needs_auth"
        }
        fn description(&self) -> &str {
            "fails with a credential error"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: Value) -> Result<Value, CourierError> {
            Err(CourierError::CredentialMissing {
                reason: "no stored credential".into(),
            })
        }
    }

    fn orchestrator(
        engine: Arc<dyn ReasoningEngine>,
        count: Arc<CountTool>,
        config: OrchestratorConfig,
    ) -> Orchestrator {
        let mut reg = ToolRegistry::new();
        reg.register(count);
        reg.register(Arc::new(FailingTool));
        reg.register(Arc::new(NoCredentialTool));
        Orchestrator::new(engine, Arc::new(reg), config)
    }

    fn tool_calls(calls: Vec<ToolCall>) -> Decision {
        Decision::ToolCalls {
            content: String::new(),
            calls,
        }
    }

    fn config(max_rounds: u32, answer_format: AnswerFormat) -> OrchestratorConfig {
        OrchestratorConfig {
            max_rounds,
            answer_format,
            system_prompt: None,
        }
    }

    #[tokio::test]
    async fn direct_answer() {
        let engine = Arc::new(Scripted::new(vec![Decision::Final("Hello!".into())]));
        let o = orchestrator(engine, Arc::default(), config(3, AnswerFormat::Plain));
        assert_eq!(o.run("hi", &[]).await.unwrap(), FinalAnswer::Plain("Hello!".into()));
    }

    #[tokio::test]
    async fn looping_engine_stalls_within_bound() {
        let count = Arc::new(CountTool::default());
        let o = orchestrator(Arc::new(Looping), count.clone(), config(4, AnswerFormat::Plain));

        let err = o.run("loop forever", &[]).await.unwrap_err();
        assert!(matches!(err, CourierError::OrchestrationStalled { rounds: 4 }));
        assert_eq!(count.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn single_round_allows_tool_call_then_answer() {
        let count = Arc::new(CountTool::default());
        let engine = Arc::new(Scripted::new(vec![
            tool_calls(vec![ToolCall::new("send-1", "count", json!({}))]),
            Decision::Final("Sent.".into()),
        ]));
        let o = orchestrator(engine.clone(), count.clone(), config(1, AnswerFormat::Plain));

        assert_eq!(o.run("send it", &[]).await.unwrap().answer(), "Sent.");
        assert_eq!(count.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn tool_calls_after_last_round_are_not_executed() {
        let count = Arc::new(CountTool::default());
        let engine = Arc::new(Scripted::new(vec![
            tool_calls(vec![ToolCall::new("a", "count", json!({}))]),
            tool_calls(vec![ToolCall::new("b", "count", json!({}))]),
            Decision::Final("unreachable".into()),
        ]));
        let o = orchestrator(engine.clone(), count.clone(), config(1, AnswerFormat::Plain));

        let err = o.run("count twice", &[]).await.unwrap_err();
        assert!(matches!(err, CourierError::OrchestrationStalled { rounds: 1 }));
        assert_eq!(count.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn text_alongside_tool_calls_is_kept() {
        let engine = Arc::new(Scripted::new(vec![
            Decision::ToolCalls {
                content: "Let me count.".into(),
                calls: vec![ToolCall::new("c1", "count", json!({}))],
            },
            Decision::Final("1".into()),
        ]));
        let o = orchestrator(engine.clone(), Arc::default(), config(2, AnswerFormat::Plain));
        o.run("count", &[]).await.unwrap();

        let seen = engine.seen.lock().unwrap();
        assert!(seen[1].iter().any(|e| matches!(
            e,
            Entry::Assistant { content, tool_calls } if content == "Let me count." && tool_calls.len() == 1
        )));
    }

    #[tokio::test]
    async fn repeated_call_id_is_not_reinvoked() {
        let count = Arc::new(CountTool::default());
        let call = ToolCall::new("same-id", "count", json!({}));
        let engine = Arc::new(Scripted::new(vec![
            tool_calls(vec![call.clone()]),
            tool_calls(vec![call.clone(), call]),
            Decision::Final("done".into()),
        ]));
        let o = orchestrator(engine.clone(), count.clone(), config(5, AnswerFormat::Plain));

        o.run("count once", &[]).await.unwrap();
        assert_eq!(count.calls.load(Ordering::SeqCst), 1);

        // Every replay carries the original result.
        let last = engine.seen.lock().unwrap().last().unwrap().clone();
        let replays: Vec<_> = last
            .iter()
            .filter_map(|e| match e {
                Entry::ToolResult { result, .. } => Some(result.message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(replays, vec!["call 1", "call 1", "call 1"]);
    }

    #[tokio::test]
    async fn recoverable_failure_becomes_error_result() {
        let engine = Arc::new(Scripted::new(vec![
            tool_calls(vec![ToolCall::new("f1", "flaky", json!({}))]),
            Decision::Final("The site is down.".into()),
        ]));
        let o = orchestrator(engine.clone(), Arc::default(), config(3, AnswerFormat::Plain));

        let answer = o.run("check the site", &[]).await.unwrap();
        assert_eq!(answer.answer(), "The site is down.");

        let seen = engine.seen.lock().unwrap();
        let Some(Entry::ToolResult { result, call_id, .. }) = seen[1].last() else {
            panic!("expected a tool result");
        };
        assert_eq!(call_id, "f1");
        assert!(result.is_error());
        assert!(result.message.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn failed_call_id_may_be_retried() {
        let engine = Arc::new(Scripted::new(vec![
            tool_calls(vec![ToolCall::new("f1", "flaky", json!({}))]),
            tool_calls(vec![ToolCall::new("f1", "flaky", json!({}))]),
            Decision::Final("gave up".into()),
        ]));
        let o = orchestrator(engine.clone(), Arc::default(), config(5, AnswerFormat::Plain));
        o.run("x", &[]).await.unwrap();

        let seen = engine.seen.lock().unwrap();
        let errors = seen[2]
            .iter()
            .filter(|e| matches!(e, Entry::ToolResult { result, .. } if result.is_error()))
            .count();
        assert_eq!(errors, 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_engine() {
        let engine = Arc::new(Scripted::new(vec![
            tool_calls(vec![ToolCall::new("u1", "teleport", json!({}))]),
            Decision::Final("I can't do that.".into()),
        ]));
        let o = orchestrator(engine, Arc::default(), config(3, AnswerFormat::Plain));
        assert_eq!(o.run("teleport me", &[]).await.unwrap().answer(), "I can't do that.");
    }

    #[tokio::test]
    async fn credential_errors_propagate() {
        let engine = Arc::new(Scripted::new(vec![tool_calls(vec![ToolCall::new(
            "a1",
            "needs_auth",
            json!({}),
        )])]));
        let o = orchestrator(engine, Arc::default(), config(3, AnswerFormat::Plain));
        let err = o.run("list", &[]).await.unwrap_err();
        assert!(matches!(err, CourierError::CredentialMissing { .. }));
    }

    #[tokio::test]
    async fn invalid_arguments_propagate() {
        let engine = Arc::new(Scripted::new(vec![tool_calls(vec![ToolCall::new(
            "a1",
            "count",
            json!("not an object"),
        )])]));
        let count = Arc::new(CountTool::default());
        let o = orchestrator(engine, count.clone(), config(3, AnswerFormat::Plain));
        let err = o.run("x", &[]).await.unwrap_err();
        assert!(matches!(err, CourierError::InvalidToolArguments { .. }));
        assert_eq!(count.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_final_answer_gets_correction_and_consumes_round() {
        let engine = Arc::new(Scripted::new(vec![
            Decision::Final("Brasília".into()),
            Decision::Final(r#"{"answer": "Brasília", "source": "https://en.wikipedia.org/wiki/Bras%C3%ADlia"}"#.into()),
        ]));
        let o = orchestrator(engine.clone(), Arc::default(), config(2, AnswerFormat::Sourced));

        let answer = o.run("capital of Brazil?", &[]).await.unwrap();
        assert_eq!(answer.source(), Some("https://en.wikipedia.org/wiki/Bras%C3%ADlia"));

        let seen = engine.seen.lock().unwrap();
        assert!(matches!(seen[1].last(), Some(Entry::Correction(_))));
    }

    #[tokio::test]
    async fn invalid_final_answers_exhaust_bound() {
        let engine = Arc::new(Scripted::new(vec![
            Decision::Final("no json".into()),
            Decision::Final("still no json".into()),
            Decision::Final("last chance, no json".into()),
        ]));
        let o = orchestrator(engine, Arc::default(), config(2, AnswerFormat::Sourced));
        let err = o.run("q", &[]).await.unwrap_err();
        assert!(matches!(err, CourierError::OrchestrationStalled { rounds: 2 }));
    }

    #[tokio::test]
    async fn state_seeded_with_system_history_and_user() {
        let engine = Arc::new(Scripted::new(vec![Decision::Final("ok".into())]));
        let o = orchestrator(engine.clone(), Arc::default(), config(1, AnswerFormat::Plain));
        let prior = vec![Turn::user("earlier"), Turn::assistant("reply")];
        o.run("now", &prior).await.unwrap();

        let seen = engine.seen.lock().unwrap();
        let first = &seen[0];
        assert!(matches!(&first[0], Entry::System(s) if s.contains("count")));
        assert_eq!(first[1], Entry::User("earlier".into()));
        assert!(matches!(&first[2], Entry::Assistant { content, .. } if content == "reply"));
        assert_eq!(first[3], Entry::User("now".into()));
    }

    #[tokio::test]
    async fn concurrent_runs_keep_separate_state() {
        let count = Arc::new(CountTool::default());
        let o = Arc::new(orchestrator(Arc::new(Looping), count.clone(), config(3, AnswerFormat::Plain)));

        let a = tokio::spawn({
            let o = Arc::clone(&o);
            async move { o.run("a", &[]).await }
        });
        let b = tokio::spawn({
            let o = Arc::clone(&o);
            async move { o.run("b", &[]).await }
        });
        assert!(a.await.unwrap().is_err());
        assert!(b.await.unwrap().is_err());
        // Ids repeat across runs ("c2", ...) but each run has its own record.
        assert_eq!(count.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn system_prompt_mentions_sourced_format() {
        let p = default_system_prompt(AnswerFormat::Sourced, &["web_search".into()]);
        assert!(p.contains("\"source\""));
        assert!(p.contains("browse_website_dynamic"));
        assert!(!default_system_prompt(AnswerFormat::Plain, &[]).contains("JSON"));
    }

    #[test]
    fn config_from_agent_config() {
        let cfg = OrchestratorConfig::from(&AgentConfig {
            max_rounds: 0,
            ..Default::default()
        });
        assert_eq!(cfg.max_rounds, 1);
        assert_eq!(OrchestratorConfig::default().max_rounds, 8);
    }
}
