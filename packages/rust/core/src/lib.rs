//! Question answering over the Triple Loop of Change knowledge base.
//!
//! This crate ties together document loading, retrieval, prompt assembly,
//! and the chat-completion collaborator into [`Assistant::answer`].

pub mod assistant;
pub mod completion;
pub mod document;
pub mod prompt;

pub use assistant::{Answer, Assistant};
pub use completion::{
    ChatMessage, Completion, CompletionClient, CompletionRequest, GroqClient, NO_ANSWER_TEXT,
    Role, Usage,
};
pub use document::{BUNDLED_KNOWLEDGE, load_document};
pub use prompt::{DEFAULT_PREAMBLE, PromptTemplate};
