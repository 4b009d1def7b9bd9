//! The tool-use orchestration loop.
//!
//! One run per inbound user utterance: append the utterance, call the model,
//! answer every requested tool invocation, repeat until the model's stop
//! indicator is terminal or the round-trip budget runs out.

use browserpilot_core::types::{ContentBlock, Message, ModelReply};
use browserpilot_core::{Config, Error, Result};
use browserpilot_providers::Provider;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{ActionDispatcher, SessionStore};

pub struct AgentRuntime {
    config: Config,
    provider: Arc<dyn Provider>,
    dispatcher: Arc<dyn ActionDispatcher>,
    sessions: SessionStore,
}

impl AgentRuntime {
    pub fn new(
        config: Config,
        provider: Arc<dyn Provider>,
        dispatcher: Arc<dyn ActionDispatcher>,
    ) -> Self {
        Self {
            config,
            provider,
            dispatcher,
            sessions: SessionStore::new(),
        }
    }

    /// Stored transcript for a conversation, empty if it was never used.
    pub fn transcript(&self, session_id: &str) -> Vec<Message> {
        self.sessions.get(session_id)
    }

    /// Drop the conversation's transcript and close its browser session.
    pub async fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
        self.dispatcher.release(session_id).await;
    }

    /// Close the conversation's browser without touching the transcript.
    pub async fn release_browser(&self, session_id: &str) {
        self.dispatcher.release(session_id).await;
    }

    /// Run the loop for one user utterance and return the full transcript.
    ///
    /// On a provider failure the stored transcript is left untouched so the
    /// next utterance can retry; on a tool-use budget overrun the transcript
    /// is committed (every invocation answered) and a distinct error is
    /// surfaced.
    pub async fn process_message(&self, session_id: &str, text: &str) -> Result<Vec<Message>> {
        info!(session = session_id, "Processing message");

        let mut transcript = self.sessions.get_or_create(session_id);
        transcript.push(Message::user(text));

        let tools = self.dispatcher.catalog();
        let max_rounds = self.config.agent.max_tool_rounds;

        for round in 1..=max_rounds {
            debug!(round, session = session_id, "Model round-trip");
            let reply = self.call_model(&transcript, &tools, round).await?;

            let assistant = Message::assistant(reply.content);
            let tool_uses: Vec<(String, String, Value)> = assistant
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            // Recorded before any dispatch, so a mid-dispatch failure never
            // leaves an invocation without a transcript entry.
            transcript.push(assistant);

            if !reply.stop_reason.is_tool_use() || tool_uses.is_empty() {
                self.sessions.save(session_id, transcript.clone());
                info!(
                    session = session_id,
                    rounds = round,
                    "Loop finished"
                );
                return Ok(transcript);
            }

            // Invocations run in reply order, sequentially: later ones may
            // depend on browser state mutated by earlier ones.
            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in &tool_uses {
                info!(session = session_id, action = %name, "Dispatching action");
                let outcome = self.dispatcher.dispatch(session_id, name, input).await;
                if outcome.is_error {
                    warn!(
                        session = session_id,
                        action = %name,
                        detail = outcome.first_text(),
                        "Action reported an error"
                    );
                }
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: outcome.content,
                    is_error: outcome.is_error,
                });
            }
            transcript.push(Message::tool_results(results));
        }

        // Every invocation above received its result, so the committed
        // transcript stays submittable on the next utterance.
        warn!(session = session_id, max_rounds, "Tool-use budget exceeded");
        self.sessions.save(session_id, transcript);
        Err(Error::ToolBudget(max_rounds))
    }

    /// Call the provider with bounded retry on transient errors.
    async fn call_model(
        &self,
        transcript: &[Message],
        tools: &[Value],
        round: u32,
    ) -> Result<ModelReply> {
        let max_retries = self.config.agent.llm_max_retries;
        let base_delay_ms = self.config.agent.llm_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay_ms = base_delay_ms * (1u64 << (attempt - 1).min(4));
                warn!(attempt, max_retries, delay_ms, round, "Retrying model call");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            match self.provider.chat(transcript, tools).await {
                Ok(reply) => {
                    if attempt > 0 {
                        info!(attempt, round, "Model call succeeded after retry");
                    }
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(error = %e, attempt, max_retries, round, "Model call failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Provider("model call failed".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use browserpilot_core::types::{ActionResult, Role, StopReason};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that plays back a fixed list of replies, then errors.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<ModelReply>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ModelReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn chat(&self, _messages: &[Message], _tools: &[Value]) -> Result<ModelReply> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Provider("scripted provider exhausted".to_string()))
        }
    }

    /// Provider that requests the same tool forever.
    struct GreedyProvider;

    #[async_trait]
    impl Provider for GreedyProvider {
        async fn chat(&self, messages: &[Message], _tools: &[Value]) -> Result<ModelReply> {
            let n = messages.len();
            Ok(tool_reply(vec![(
                format!("toolu_{}", n),
                "screenshot".to_string(),
                json!({"name": format!("shot_{}", n)}),
            )]))
        }
    }

    /// Dispatcher stub: succeeds for everything except the name "explode",
    /// records every call.
    #[derive(Default)]
    struct StubDispatcher {
        calls: Mutex<Vec<(String, String)>>,
        released: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionDispatcher for StubDispatcher {
        fn catalog(&self) -> Vec<Value> {
            vec![json!({"name": "navigate", "description": "", "input_schema": {"type": "object"}})]
        }

        async fn dispatch(&self, conversation: &str, name: &str, _args: &Value) -> ActionResult {
            self.calls
                .lock()
                .unwrap()
                .push((conversation.to_string(), name.to_string()));
            if name == "explode" {
                ActionResult::error(format!("Unknown tool: {}", name))
            } else {
                ActionResult::text(format!("ok: {}", name))
            }
        }

        async fn release(&self, conversation: &str) {
            self.released.lock().unwrap().push(conversation.to_string());
        }
    }

    fn tool_reply(uses: Vec<(String, String, Value)>) -> ModelReply {
        ModelReply {
            content: uses
                .into_iter()
                .map(|(id, name, input)| ContentBlock::ToolUse { id, name, input })
                .collect(),
            stop_reason: StopReason::ToolUse,
            usage: Value::Null,
        }
    }

    fn text_reply(text: &str) -> ModelReply {
        ModelReply {
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            stop_reason: StopReason::EndTurn,
            usage: Value::Null,
        }
    }

    fn test_config(max_tool_rounds: u32) -> Config {
        let mut config = Config::default();
        config.agent.max_tool_rounds = max_tool_rounds;
        config.agent.llm_max_retries = 0;
        config.agent.llm_retry_delay_ms = 1;
        config
    }

    fn tool_result_ids(message: &Message) -> Vec<(&str, bool)> {
        message
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    ..
                } => Some((tool_use_id.as_str(), *is_error)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_single_tool_happy_path() {
        let provider = ScriptedProvider::new(vec![
            tool_reply(vec![(
                "toolu_1".to_string(),
                "navigate".to_string(),
                json!({"url": "https://example.com"}),
            )]),
            text_reply("The page is open."),
        ]);
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher.clone());

        let transcript = runtime
            .process_message("s1", "go to example.com")
            .await
            .unwrap();

        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].tool_uses().len(), 1);
        assert_eq!(transcript[2].role, Role::User);
        assert_eq!(tool_result_ids(&transcript[2]), vec![("toolu_1", false)]);
        assert_eq!(transcript[3].role, Role::Assistant);
        assert_eq!(transcript[3].text(), "The page is open.");

        // The committed transcript matches the returned one.
        assert_eq!(runtime.transcript("s1").len(), 4);
        assert_eq!(
            *dispatcher.calls.lock().unwrap(),
            vec![("s1".to_string(), "navigate".to_string())]
        );
    }

    #[tokio::test]
    async fn test_every_tool_use_gets_exactly_one_result_in_order() {
        let provider = ScriptedProvider::new(vec![
            tool_reply(vec![
                (
                    "toolu_a".to_string(),
                    "click".to_string(),
                    json!({"locator": "#go"}),
                ),
                (
                    "toolu_b".to_string(),
                    "screenshot".to_string(),
                    json!({"name": "after"}),
                ),
            ]),
            text_reply("done"),
        ]);
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher.clone());

        let transcript = runtime.process_message("s1", "click go").await.unwrap();

        let ids = tool_result_ids(&transcript[2]);
        assert_eq!(ids, vec![("toolu_a", false), ("toolu_b", false)]);

        // Sequential, in reply order.
        let calls = dispatcher.calls.lock().unwrap();
        assert_eq!(calls[0].1, "click");
        assert_eq!(calls[1].1, "screenshot");
    }

    #[tokio::test]
    async fn test_action_error_folds_in_and_loop_continues() {
        let provider = ScriptedProvider::new(vec![
            tool_reply(vec![(
                "toolu_1".to_string(),
                "explode".to_string(),
                json!({}),
            )]),
            text_reply("that tool does not exist"),
        ]);
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher);

        let transcript = runtime.process_message("s1", "do something").await.unwrap();

        assert_eq!(tool_result_ids(&transcript[2]), vec![("toolu_1", true)]);
        assert_eq!(transcript[3].text(), "that tool does not exist");
    }

    #[tokio::test]
    async fn test_tool_budget_exceeded_is_distinct_error() {
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(2), Arc::new(GreedyProvider), dispatcher);

        let err = runtime.process_message("s1", "loop forever").await.unwrap_err();
        assert!(matches!(err, Error::ToolBudget(2)));

        // The committed transcript answers every invocation: user message
        // plus two (assistant, tool_results) pairs.
        let transcript = runtime.transcript("s1");
        assert_eq!(transcript.len(), 5);
        for pair in transcript[1..].chunks(2) {
            let uses = pair[0].tool_uses().len();
            assert_eq!(tool_result_ids(&pair[1]).len(), uses);
        }
    }

    #[tokio::test]
    async fn test_round_trip_count_matches_tool_use_stops() {
        let provider = ScriptedProvider::new(vec![
            tool_reply(vec![(
                "t1".to_string(),
                "navigate".to_string(),
                json!({"url": "https://example.com"}),
            )]),
            tool_reply(vec![(
                "t2".to_string(),
                "screenshot".to_string(),
                json!({"name": "home"}),
            )]),
            tool_reply(vec![(
                "t3".to_string(),
                "click".to_string(),
                json!({"locator": "#go"}),
            )]),
            text_reply("all done"),
        ]);
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher.clone());

        let transcript = runtime.process_message("s1", "do a few things").await.unwrap();

        assert_eq!(dispatcher.calls.lock().unwrap().len(), 3);
        let assistant_count = transcript
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();
        assert_eq!(assistant_count, 4);
    }

    #[tokio::test]
    async fn test_provider_failure_preserves_stored_transcript() {
        let dispatcher = Arc::new(StubDispatcher::default());
        // Exhausted immediately: every chat call fails.
        let provider = ScriptedProvider::new(vec![]);
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher);

        let prior = vec![Message::user("earlier"), Message::assistant(vec![])];
        runtime.sessions.save("s1", prior.clone());

        let err = runtime.process_message("s1", "this will fail").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        let stored = runtime.transcript("s1");
        assert_eq!(stored.len(), prior.len());
        assert_eq!(stored[0].text(), "earlier");
    }

    #[tokio::test]
    async fn test_clear_session_drops_transcript_and_releases_browser() {
        let provider = ScriptedProvider::new(vec![text_reply("hi")]);
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher.clone());

        runtime.process_message("s1", "hello").await.unwrap();
        assert!(!runtime.transcript("s1").is_empty());

        runtime.clear_session("s1").await;
        assert!(runtime.transcript("s1").is_empty());
        assert_eq!(*dispatcher.released.lock().unwrap(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn test_plain_chat_needs_no_dispatch() {
        let provider = ScriptedProvider::new(vec![text_reply("hello there")]);
        let dispatcher = Arc::new(StubDispatcher::default());
        let runtime = AgentRuntime::new(test_config(12), provider, dispatcher.clone());

        let transcript = runtime.process_message("s1", "hi").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(dispatcher.calls.lock().unwrap().is_empty());
    }
}
