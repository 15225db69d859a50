//! Python code generation using the high-capability model
//!
//! The generated text is returned for display only. Nothing here runs it.

use crate::llm::{LlmRequest, LlmService};
use crate::prompts;

/// Generate Python code for `prompt`.
///
/// Never fails: an empty model answer or a provider error is turned into a
/// labeled message the chat can show as-is.
pub async fn generate_code(prompt: &str, llm_service: &dyn LlmService) -> String {
    let request = LlmRequest::with_persona(prompts::CODE_PERSONA, prompt);

    match llm_service.complete(&request).await {
        Ok(response) if response.is_empty() => prompts::NO_CODE.to_string(),
        Ok(response) => response.text(),
        Err(e) => {
            tracing::warn!(model = %llm_service.model_id(), error = %e, "Code generation failed");
            prompts::code_generation_error(&e.message)
        }
    }
}
