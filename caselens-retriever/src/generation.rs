//! Grounded answer generation on top of retrieval.
//!
//! The generator itself is an outside service behind [`GenerationAdapter`]. This
//! module retrieves context, builds the prompt, and makes sure that whatever the
//! generator does, the caller gets an answer string: adapter failures and empty
//! context both come back as [`NOT_FOUND_SENTINEL`].

use crate::config::GenerationConfig;
use crate::error::{Result, RetrieverError};
use crate::retrieval::retriever::Retriever;
use async_trait::async_trait;
use caselens_context::{NOT_FOUND_SENTINEL, Passage, build_answer_prompt, format_context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Text-in, text-out generation backend.
#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Non-streaming client for Ollama's `/api/generate`.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RetrieverError::generation)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl GenerationAdapter for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Posting {} prompt chars to {}", prompt.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&OllamaRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(RetrieverError::generation)?;

        let body: OllamaResponse = response.json().await.map_err(RetrieverError::generation)?;
        Ok(body.response)
    }
}

/// Answer to one question, with the passages it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub passages: Vec<Passage>,
    /// False when the sentinel was substituted for a generated answer
    pub generated: bool,
}

impl Answer {
    fn not_found(passages: Vec<Passage>) -> Self {
        Self {
            text: NOT_FOUND_SENTINEL.to_string(),
            passages,
            generated: false,
        }
    }
}

/// Retrieve `top_k` passages for `question` and ask the generator to answer from them.
///
/// Returns the sentinel answer when nothing relevant is retrieved or the adapter
/// fails. Only retrieval errors (for example an unavailable embedding backend)
/// are returned as `Err`.
pub async fn answer_question(
    retriever: &Retriever,
    adapter: &dyn GenerationAdapter,
    question: &str,
    top_k: usize,
) -> Result<Answer> {
    let passages = retriever.retrieve_context(question, top_k).await?;
    let context = format_context(&passages);
    if context.is_empty() {
        info!("No context retrieved for question, answering with sentinel");
        return Ok(Answer::not_found(passages));
    }

    let prompt = build_answer_prompt(&context, question);
    match adapter.generate(&prompt).await {
        Ok(text) if !text.trim().is_empty() => Ok(Answer {
            text: text.trim().to_string(),
            passages,
            generated: true,
        }),
        Ok(_) => {
            warn!("Generator returned an empty answer");
            Ok(Answer::not_found(passages))
        }
        Err(e) => {
            warn!("Generation failed: {e}");
            Ok(Answer::not_found(passages))
        }
    }
}
