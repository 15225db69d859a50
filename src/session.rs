//! Chat session adapter
//!
//! Glue between a chat UI host and the conversation graph. The host calls
//! `on_chat_start` once per session and `on_message` for every user message;
//! everything the user sees goes out through a `ChatSink`.

use crate::graph::{ConversationGraph, ConversationState, GraphError};
use crate::prompts;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the UI should treat a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Reply,
    /// Placeholder shown while the model works; replaced by the next reply
    Thinking,
}

/// A message sent to the chat UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub content: String,
}

impl OutboundMessage {
    pub fn reply(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Reply,
            content: content.into(),
        }
    }

    pub fn thinking() -> Self {
        Self {
            kind: MessageKind::Thinking,
            content: prompts::THINKING.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("chat session is closed")]
    Closed,
}

/// Outbound side of the chat UI
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError>;
}

#[derive(Debug, Error)]
enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// True if the message asks for the current time
pub fn asks_for_time(text: &str) -> bool {
    text.to_lowercase().contains("time")
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`
pub fn local_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Per-message handler. Holds no conversation state between calls.
#[derive(Clone)]
pub struct ChatSession {
    graph: Arc<ConversationGraph>,
    thinking_delay: Duration,
}

impl ChatSession {
    pub fn new(graph: Arc<ConversationGraph>, thinking_delay: Duration) -> Self {
        Self {
            graph,
            thinking_delay,
        }
    }

    pub async fn on_chat_start(&self, sink: &dyn ChatSink) {
        if let Err(e) = sink.send(OutboundMessage::reply(prompts::WELCOME)).await {
            tracing::warn!(error = %e, "Failed to send welcome message");
        }
    }

    /// Handle one user message. Never fails: errors are shown to the user.
    pub async fn on_message(&self, text: &str, sink: &dyn ChatSink) {
        if let Err(e) = self.handle_message(text, sink).await {
            match &e {
                SessionError::Graph(GraphError::Node { node, .. }) => {
                    tracing::error!(node = %node, error = %e, "Graph node failed");
                }
                _ => tracing::error!(error = %e, "Message handling failed"),
            }
            if let Err(send_err) = sink
                .send(OutboundMessage::reply(prompts::critical_error(&e.to_string())))
                .await
            {
                tracing::warn!(error = %send_err, "Failed to report error to chat");
            }
        }
    }

    async fn handle_message(&self, text: &str, sink: &dyn ChatSink) -> Result<(), SessionError> {
        if asks_for_time(text) {
            let timestamp = local_timestamp();
            sink.send(OutboundMessage::reply(prompts::current_time(&timestamp)))
                .await?;
            return Ok(());
        }

        sink.send(OutboundMessage::thinking()).await?;
        tokio::time::sleep(self.thinking_delay).await;

        let state = self
            .graph
            .invoke(ConversationState::from_human(text))
            .await?;

        let content = match state.last() {
            Some(message) => prompts::reply(&message.content),
            None => prompts::GRAPH_EMPTY.to_string(),
        };
        sink.send(OutboundMessage::reply(content)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Node, NodeError, StateUpdate};
    use crate::llm::testing::MockLlmService;
    use crate::llm::{LlmResponse, ModelRegistry};
    use crate::responder::conversation_graph;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<OutboundMessage>>,
        /// Fail every send after this many successes
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<OutboundMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(SinkError::Closed);
            }
            sent.push(message);
            Ok(())
        }
    }

    fn session_with(fast: Arc<MockLlmService>, capable: Arc<MockLlmService>) -> ChatSession {
        let registry = Arc::new(ModelRegistry::from_services(fast, capable));
        ChatSession::new(Arc::new(conversation_graph(registry).unwrap()), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_welcome_banner() {
        let session = session_with(
            Arc::new(MockLlmService::new("fast")),
            Arc::new(MockLlmService::new("capable")),
        );
        let sink = RecordingSink::default();
        session.on_chat_start(&sink).await;

        assert_eq!(sink.messages(), vec![OutboundMessage::reply(prompts::WELCOME)]);
    }

    #[tokio::test]
    async fn test_time_query_bypasses_model() {
        let fast = Arc::new(MockLlmService::new("fast"));
        let capable = Arc::new(MockLlmService::new("capable"));
        let session = session_with(fast.clone(), capable.clone());
        let sink = RecordingSink::default();

        session.on_message("What time is it?", &sink).await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        let content = &messages[0].content;
        let timestamp = content
            .strip_prefix("🕒 **Current Time:** ")
            .expect("time prefix");
        let parsed = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).unwrap();
        let drift = (chrono::Local::now().naive_local() - parsed).num_seconds().abs();
        assert!(drift <= 2, "timestamp {timestamp} is {drift}s off");

        assert_eq!(fast.call_count(), 0);
        assert_eq!(capable.call_count(), 0);
    }

    #[tokio::test]
    async fn test_time_check_wins_over_code_trigger() {
        let fast = Arc::new(MockLlmService::always("fast", "unused"));
        let capable = Arc::new(MockLlmService::always("capable", "unused"));
        let session = session_with(fast.clone(), capable.clone());
        let sink = RecordingSink::default();

        session
            .on_message("generate code that prints the time", &sink)
            .await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Reply);
        assert!(messages[0].content.starts_with("🕒 **Current Time:** "));
        assert_eq!(fast.call_count(), 0);
        assert_eq!(capable.call_count(), 0);
    }

    #[tokio::test]
    async fn test_plain_message_flow() {
        let fast = Arc::new(MockLlmService::always("fast", "Hello! How can I help?"));
        let session = session_with(fast.clone(), Arc::new(MockLlmService::new("capable")));
        let sink = RecordingSink::default();

        session.on_message("Hi there", &sink).await;

        assert_eq!(
            sink.messages(),
            vec![
                OutboundMessage::thinking(),
                OutboundMessage::reply("💬 Hello! How can I help?"),
            ]
        );
        assert_eq!(fast.call_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_code_scenario() {
        let capable = Arc::new(MockLlmService::always("capable", "def rev(s):\n    return s[::-1]"));
        let session = session_with(Arc::new(MockLlmService::new("fast")), capable);
        let sink = RecordingSink::default();

        session
            .on_message("Please generate code to reverse a string", &sink)
            .await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        let reply = &messages[1].content;
        let body = reply.strip_prefix("💬 ").expect("display marker");
        assert!(body.starts_with("📝 **Generated Python Code:**"));
        assert!(body.contains("```python\n"));
        assert!(body.trim_end().ends_with("```"));
    }

    #[tokio::test]
    async fn test_empty_model_text_scenario() {
        let fast = Arc::new(MockLlmService::new("fast"));
        fast.queue_response(LlmResponse::default());
        let session = session_with(fast, Arc::new(MockLlmService::new("capable")));
        let sink = RecordingSink::default();

        session.on_message("Why is the sky blue?", &sink).await;

        let messages = sink.messages();
        assert_eq!(
            messages.last(),
            Some(&OutboundMessage::reply(prompts::reply(prompts::NO_RESPONSE)))
        );
    }

    struct Broken;

    #[async_trait]
    impl Node for Broken {
        async fn run(&self, _state: &ConversationState) -> Result<StateUpdate, NodeError> {
            Err("node exploded".into())
        }
    }

    #[tokio::test]
    async fn test_graph_failure_is_critical_error() {
        let graph = GraphBuilder::new()
            .add_node("broken", Arc::new(Broken))
            .set_entry_point("broken")
            .compile()
            .unwrap();
        let session = ChatSession::new(Arc::new(graph), Duration::ZERO);
        let sink = RecordingSink::default();

        session.on_message("hello", &sink).await;
        session.on_message("hello again", &sink).await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[1],
            OutboundMessage::reply("❌ **Critical Error:** node exploded")
        );
        assert_eq!(messages[3], messages[1]);
    }

    #[tokio::test]
    async fn test_closed_sink_does_not_panic() {
        let session = session_with(
            Arc::new(MockLlmService::always("fast", "x")),
            Arc::new(MockLlmService::new("capable")),
        );
        let sink = RecordingSink {
            fail_after: Some(0),
            ..Default::default()
        };

        session.on_chat_start(&sink).await;
        session.on_message("hello", &sink).await;
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_thinking_delay_is_applied() {
        let registry = Arc::new(ModelRegistry::from_services(
            Arc::new(MockLlmService::always("fast", "ok")),
            Arc::new(MockLlmService::new("capable")),
        ));
        let session = ChatSession::new(
            Arc::new(conversation_graph(registry).unwrap()),
            Duration::from_millis(50),
        );
        let sink = RecordingSink::default();

        let start = tokio::time::Instant::now();
        session.on_message("hello", &sink).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    proptest! {
        #[test]
        fn prop_any_casing_of_time_matches(prefix in "[a-z ]{0,10}", mask in 0u8..16) {
            let word: String = "time"
                .chars()
                .enumerate()
                .map(|(i, c)| if mask & (1 << i) != 0 { c.to_ascii_uppercase() } else { c })
                .collect();
            let text = format!("{prefix}{word}?");
            prop_assert!(asks_for_time(&text));
        }
    }

    #[test]
    fn test_time_substring_semantics() {
        assert!(asks_for_time("sometimes I wonder"));
        assert!(!asks_for_time("what day is it"));
    }
}
