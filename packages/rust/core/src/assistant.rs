//! Question answering: retrieve context, build the prompt, ask the model.

use std::sync::Arc;

use tracing::{info, instrument};

use tripleloop_retrieval::Retriever;
use tripleloop_shared::{AppConfig, CompletionConfig, Result, TripleLoopError};

use crate::completion::{CompletionClient, CompletionRequest, GroqClient, Usage};
use crate::document::load_document;
use crate::prompt::PromptTemplate;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub model: String,
    /// Number of chunks placed into the prompt.
    pub context_chunks: usize,
    /// No chunk matched and the leading chunks were used instead.
    pub fallback: bool,
    pub usage: Usage,
}

/// The framework expert. Cheap to clone; every clone shares the knowledge base
/// and the completion client.
#[derive(Clone)]
pub struct Assistant {
    retriever: Retriever,
    client: Arc<dyn CompletionClient>,
    prompt: PromptTemplate,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("retriever", &self.retriever)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Assistant {
    pub fn new(
        retriever: Retriever,
        client: Arc<dyn CompletionClient>,
        completion: &CompletionConfig,
    ) -> Self {
        Self {
            retriever,
            client,
            prompt: PromptTemplate::default(),
            model: completion.model.clone(),
            temperature: completion.temperature,
            max_tokens: completion.max_tokens,
        }
    }

    /// Load the knowledge document, build the retriever and a Groq client.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let document = load_document(config.knowledge.document_path.as_deref())?;
        let retriever = Retriever::from_config(document, config)?;
        let client = GroqClient::from_config(&config.completion)?;
        Ok(Self::new(retriever, Arc::new(client), &config.completion))
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer one question against the knowledge base.
    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TripleLoopError::validation("question is empty"));
        }

        let (context, context_chunks, fallback) = {
            let results = self.retriever.retrieve(question);
            (
                results.context_block(self.retriever.separator()),
                results.len(),
                results.fallback,
            )
        };

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: self.prompt.messages(&context, question),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let completion = self.client.complete(&request).await?;

        info!(
            context_chunks,
            fallback,
            total_tokens = completion.usage.total_tokens,
            "question answered"
        );

        Ok(Answer {
            text: completion.text,
            model: completion.model,
            context_chunks,
            fallback,
            usage: completion.usage,
        })
    }
}
