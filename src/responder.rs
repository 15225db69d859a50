//! Conversation responder: the one decision point of the assistant
//!
//! Looks at the latest human message and either hands it to code generation
//! or forwards it to the fast model with the assistant persona.

use crate::codegen::generate_code;
use crate::graph::{
    ConversationGraph, ConversationState, GraphBuilder, GraphError, Node, NodeError, StateUpdate,
};
use crate::llm::{LlmRequest, ModelRegistry, ModelVariant};
use crate::prompts;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Name of the responder node in the conversation graph
pub const NODE_NAME: &str = "gemini";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponderError {
    #[error("Expected the last message to be from a human")]
    LastMessageNotHuman,
}

/// True if `text` asks for generated code
pub fn wants_code(text: &str) -> bool {
    let lower = text.to_lowercase();
    prompts::CODE_TRIGGERS.iter().any(|t| lower.contains(t))
}

pub struct Responder {
    models: Arc<ModelRegistry>,
}

impl Responder {
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self { models }
    }

    /// Produce exactly one assistant message for the last human message.
    ///
    /// Provider failures become assistant messages; only a state that does
    /// not end in a human message is an error.
    pub async fn respond(&self, state: &ConversationState) -> Result<StateUpdate, ResponderError> {
        let user_input = match state.last() {
            Some(msg) if msg.is_human() => msg.content.as_str(),
            _ => return Err(ResponderError::LastMessageNotHuman),
        };

        if wants_code(user_input) {
            tracing::info!("Routing message to code generation");
            let service = self.models.get(ModelVariant::Capable);
            let code = generate_code(user_input, service.as_ref()).await;
            return Ok(StateUpdate::reply(prompts::generated_code(&code)));
        }

        let service = self.models.get(ModelVariant::Fast);
        let request = LlmRequest::with_persona(prompts::ASSISTANT_PERSONA, user_input);

        let reply = match service.complete(&request).await {
            Ok(response) if response.is_empty() => prompts::NO_RESPONSE.to_string(),
            Ok(response) => response.text(),
            Err(e) => prompts::unexpected_error(&e.message),
        };

        Ok(StateUpdate::reply(reply))
    }
}

#[async_trait]
impl Node for Responder {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, NodeError> {
        Ok(self.respond(state).await?)
    }
}

/// Build the conversation graph: a single responder node that is both entry and exit.
pub fn conversation_graph(models: Arc<ModelRegistry>) -> Result<ConversationGraph, GraphError> {
    GraphBuilder::new()
        .add_node(NODE_NAME, Arc::new(Responder::new(models)))
        .set_entry_point(NODE_NAME)
        .compile()
}
