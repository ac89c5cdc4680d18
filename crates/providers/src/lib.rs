//! Language-completion providers used for post-call summaries and
//! sentiment analysis.

pub mod openai_compat;
pub mod traits;
pub mod util;

// Re-exports for convenience.
pub use openai_compat::OpenAiCompatProvider;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, Message, Role, Usage};
