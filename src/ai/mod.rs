mod gemini;
pub mod prompts;
mod response;

use async_trait::async_trait;

use crate::error::Result;

pub use gemini::GeminiClient;
pub use response::InferenceResponse;

/// Text generation backend used by the email jobs.
#[async_trait]
pub trait SummarizationGateway: Send + Sync {
    async fn infer(&self, prompt: &str) -> Result<InferenceResponse>;
}
