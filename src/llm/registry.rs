//! Model registry for the two model variants the assistant uses

use super::{GeminiService, LlmError, LlmService, LoggingService};
use crate::config::Config;
use std::sync::Arc;

/// Which hosted model configuration handles a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// Faster/cheaper model for general chat
    Fast,
    /// Higher-capability model for code generation
    Capable,
}

/// Registry of the configured model services
pub struct ModelRegistry {
    fast: Arc<dyn LlmService>,
    capable: Arc<dyn LlmService>,
}

impl ModelRegistry {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let fast = GeminiService::new(config.api_key.clone(), &config.fast_model, &config.base_url)?;
        let capable =
            GeminiService::new(config.api_key.clone(), &config.code_model, &config.base_url)?;

        Ok(Self::from_services(Arc::new(fast), Arc::new(capable)))
    }

    /// Build a registry from arbitrary services, wrapping each with logging
    pub fn from_services(fast: Arc<dyn LlmService>, capable: Arc<dyn LlmService>) -> Self {
        Self {
            fast: Arc::new(LoggingService::new(fast)),
            capable: Arc::new(LoggingService::new(capable)),
        }
    }

    pub fn get(&self, variant: ModelVariant) -> Arc<dyn LlmService> {
        match variant {
            ModelVariant::Fast => self.fast.clone(),
            ModelVariant::Capable => self.capable.clone(),
        }
    }

    pub fn model_id(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::Fast => self.fast.model_id(),
            ModelVariant::Capable => self.capable.model_id(),
        }
    }
}
