//! Model-name provider routing
//!
//! Candidate lists mix Gemini and OpenAI models; this adapter implements
//! both generation seams by inferring the provider class from the model
//! name and delegating to the matching client. A provider without a
//! configured client fails softly so the fallback walk can move on.

use async_trait::async_trait;
use serde_json::Value;

use shared::{ProviderFailure, ProviderKind};

use crate::services::{GeminiClient, OpenAiClient};
use crate::traits::{ImageGenerator, TextGenerator};
use crate::types::ImagePayload;

#[derive(Clone)]
pub struct ProviderRouter {
    gemini: Option<GeminiClient>,
    openai: Option<OpenAiClient>,
}

impl ProviderRouter {
    pub fn new(gemini: Option<GeminiClient>, openai: Option<OpenAiClient>) -> Self {
        Self { gemini, openai }
    }

    pub fn has_any_provider(&self) -> bool {
        self.gemini.is_some() || self.openai.is_some()
    }
}

fn missing_key(provider: ProviderKind) -> ProviderFailure {
    let variable = match provider {
        ProviderKind::Gemini => "GEMINI_API_KEY",
        ProviderKind::OpenAi => "OPENAI_API_KEY",
    };
    ProviderFailure::Network(format!(
        "no API key configured for {provider} (set {variable})"
    ))
}

#[async_trait]
impl TextGenerator for ProviderRouter {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<Value, ProviderFailure> {
        match ProviderKind::infer(model) {
            ProviderKind::Gemini => match &self.gemini {
                Some(client) => client.generate_text(model, prompt).await,
                None => Err(missing_key(ProviderKind::Gemini)),
            },
            ProviderKind::OpenAi => match &self.openai {
                Some(client) => client.generate_text(model, prompt).await,
                None => Err(missing_key(ProviderKind::OpenAi)),
            },
        }
    }
}

#[async_trait]
impl ImageGenerator for ProviderRouter {
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<ImagePayload, ProviderFailure> {
        match ProviderKind::infer(model) {
            ProviderKind::Gemini => match &self.gemini {
                Some(client) => client.generate_image(model, prompt).await,
                None => Err(missing_key(ProviderKind::Gemini)),
            },
            ProviderKind::OpenAi => match &self.openai {
                Some(client) => client.generate_image(model, prompt).await,
                None => Err(missing_key(ProviderKind::OpenAi)),
            },
        }
    }
}
