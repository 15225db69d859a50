//! Conversation graph
//!
//! A named set of nodes with an entry point. Every node is terminal today, so
//! an invocation runs the entry node once and appends what it returns.

pub mod state;

pub use state::{ConversationState, Message, Role, StateUpdate};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// A step in the conversation graph
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, NodeError>;
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0:?} is already defined")]
    DuplicateNode(String),
    #[error("graph has no entry point")]
    MissingEntryPoint,
    #[error("entry point {0:?} is not a node")]
    UnknownNode(String),
    #[error("{source}")]
    Node {
        node: String,
        #[source]
        source: NodeError,
    },
}

/// Graph under construction
#[derive(Default)]
pub struct GraphBuilder {
    nodes: HashMap<String, Arc<dyn Node>>,
    entry: Option<String>,
    duplicate: Option<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, name: impl Into<String>, node: Arc<dyn Node>) -> Self {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            self.duplicate.get_or_insert(name);
        } else {
            self.nodes.insert(name, node);
        }
        self
    }

    pub fn set_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    pub fn compile(mut self) -> Result<ConversationGraph, GraphError> {
        if let Some(name) = self.duplicate {
            return Err(GraphError::DuplicateNode(name));
        }
        let entry_name = self.entry.ok_or(GraphError::MissingEntryPoint)?;
        let entry = self
            .nodes
            .remove(&entry_name)
            .ok_or_else(|| GraphError::UnknownNode(entry_name.clone()))?;

        Ok(ConversationGraph { entry_name, entry })
    }
}

/// Compiled, immutable graph. Safe to share between sessions.
pub struct ConversationGraph {
    entry_name: String,
    entry: Arc<dyn Node>,
}

impl ConversationGraph {
    pub fn entry_point(&self) -> &str {
        &self.entry_name
    }

    /// Run the graph on `state` and return the state with the node's reply appended.
    pub async fn invoke(&self, mut state: ConversationState) -> Result<ConversationState, GraphError> {
        tracing::debug!(node = %self.entry_name, messages = state.messages.len(), "Running graph node");

        let update = self
            .entry
            .run(&state)
            .await
            .map_err(|source| GraphError::Node {
                node: self.entry_name.clone(),
                source,
            })?;

        state.apply(update);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Node for Echo {
        async fn run(&self, state: &ConversationState) -> Result<StateUpdate, NodeError> {
            let last = state.last().ok_or("empty state")?;
            Ok(StateUpdate::reply(format!("echo: {}", last.content)))
        }
    }

    #[tokio::test]
    async fn test_invoke_appends_reply() {
        let graph = GraphBuilder::new()
            .add_node("echo", Arc::new(Echo))
            .set_entry_point("echo")
            .compile()
            .unwrap();
        assert_eq!(graph.entry_point(), "echo");

        let out = graph.invoke(ConversationState::from_human("hi")).await.unwrap();
        assert_eq!(
            out.messages,
            vec![Message::human("hi"), Message::assistant("echo: hi")]
        );
    }

    #[tokio::test]
    async fn test_node_error_propagates() {
        let graph = GraphBuilder::new()
            .add_node("echo", Arc::new(Echo))
            .set_entry_point("echo")
            .compile()
            .unwrap();

        let err = graph.invoke(ConversationState::default()).await.unwrap_err();
        match err {
            GraphError::Node { node, source } => {
                assert_eq!(node, "echo");
                assert_eq!(source.to_string(), "empty state");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            GraphBuilder::new().add_node("a", Arc::new(Echo)).compile(),
            Err(GraphError::MissingEntryPoint)
        ));
        assert!(matches!(
            GraphBuilder::new()
                .add_node("a", Arc::new(Echo))
                .set_entry_point("b")
                .compile(),
            Err(GraphError::UnknownNode(name)) if name == "b"
        ));
        assert!(matches!(
            GraphBuilder::new()
                .add_node("a", Arc::new(Echo))
                .add_node("a", Arc::new(Echo))
                .set_entry_point("a")
                .compile(),
            Err(GraphError::DuplicateNode(name)) if name == "a"
        ));
    }
}
