//! Advisory model adapters
//!
//! The advisory model is a generative language model asked for a qualitative
//! opinion about a dependency. Adapters only move text in and out; turning that
//! text into an opinion happens in the application layer.

use async_trait::async_trait;

use crate::application::errors::AdvisoryError;

pub mod gemini;
pub mod prompts;
pub mod response_parser;

pub use gemini::GeminiAdvisoryModel;
pub use response_parser::ResponseParser;

/// Sampling options sent with a prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationOptions {
    pub const RISK_ANALYSIS: Self = Self {
        temperature: 0.2,
        max_output_tokens: 2048,
    };

    pub const RECOMMENDATION: Self = Self {
        temperature: 0.3,
        max_output_tokens: 1024,
    };

    pub const ECOSYSTEM_ASSESSMENT: Self = Self {
        temperature: 0.1,
        max_output_tokens: 1024,
    };
}

#[async_trait]
pub trait AdvisoryModel: Send + Sync {
    /// Send a prompt and return the generated text
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AdvisoryError>;
}
